//! Background threads that run outbox jobs on an interval.

use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info, warn};

use super::{OutboxJob, StopSignal};
use crate::config::OutboxConfig;
use crate::error::WorkerError;
use crate::outbox::{EventPublisher, OutboxJanitor, OutboxProcessor, OutboxStore};

/// Statistics from a job thread.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobStats {
    pub runs: usize,
    pub failures: usize,
}

enum Command {
    Trigger,
    Stop,
}

/// A named OS thread that runs a job immediately, then once per interval
/// or whenever triggered, until stopped.
///
/// ```ignore
/// let thread = JobThread::spawn(processor, Duration::from_secs(5))?;
/// // ... commit aggregates ...
/// thread.trigger();
/// let stats = thread.stop();
/// ```
pub struct JobThread {
    name: &'static str,
    stop: StopSignal,
    commands: Sender<Command>,
    handle: Option<JoinHandle<JobStats>>,
}

impl JobThread {
    pub fn spawn<J: OutboxJob + 'static>(mut job: J, interval: Duration) -> Result<Self, WorkerError> {
        if interval.is_zero() {
            return Err(WorkerError::ZeroInterval);
        }

        let (commands, rx) = channel();
        let stop = StopSignal::new();
        let thread_stop = stop.clone();
        let name = job.name();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut stats = JobStats::default();
                info!(job = name, interval_ms = interval.as_millis() as u64, "outbox job started");

                loop {
                    if thread_stop.is_stopped() {
                        break;
                    }

                    stats.runs += 1;
                    if let Err(err) = job.execute(&thread_stop) {
                        stats.failures += 1;
                        error!(job = name, error = %err, "outbox job run failed");
                    }

                    match rx.recv_timeout(interval) {
                        Ok(Command::Trigger) | Err(RecvTimeoutError::Timeout) => {}
                        Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                info!(job = name, runs = stats.runs, failures = stats.failures, "outbox job stopped");
                stats
            })?;

        Ok(JobThread {
            name,
            stop,
            commands,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the job now instead of waiting for the interval.
    pub fn trigger(&self) {
        if self.commands.send(Command::Trigger).is_err() {
            warn!(job = self.name, "outbox job thread is gone, trigger dropped");
        }
    }

    /// Signal the job to stop without waiting. A run in progress sees the
    /// signal through its `StopSignal`.
    pub fn signal_stop(&self) {
        self.stop.stop();
        let _ = self.commands.send(Command::Stop);
    }

    /// Signal the job to stop and wait for it to finish.
    pub fn stop(mut self) -> JobStats {
        self.signal_stop();
        let Some(handle) = self.handle.take() else {
            return JobStats::default();
        };
        match handle.join() {
            Ok(stats) => stats,
            Err(_) => {
                error!(job = self.name, "outbox job thread panicked, stats lost");
                JobStats::default()
            }
        }
    }
}

impl Drop for JobThread {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

/// Statistics from both outbox workers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub processor: JobStats,
    pub janitor: JobStats,
}

/// The processor and janitor, each on its own thread, configured from an
/// [`OutboxConfig`].
pub struct OutboxWorkers {
    processor: JobThread,
    janitor: JobThread,
}

impl OutboxWorkers {
    /// Spawn both workers. Batch sizes and intervals come from `config`, which
    /// is validated first.
    pub fn spawn<S, P, J>(
        processor: OutboxProcessor<S, P>,
        janitor: OutboxJanitor<J>,
        config: &OutboxConfig,
    ) -> Result<Self, WorkerError>
    where
        S: OutboxStore + 'static,
        P: EventPublisher + Send + 'static,
        J: OutboxStore + 'static,
    {
        config.validate()?;

        let processor = processor.with_batch_size(config.processor_batch_size);
        let janitor = janitor.with_batch_size(config.janitor_batch_size);

        let processor = JobThread::spawn(processor, config.processor_interval())?;
        let janitor = JobThread::spawn(janitor, config.janitor_interval())?;
        Ok(OutboxWorkers { processor, janitor })
    }

    pub fn trigger_processor(&self) {
        self.processor.trigger();
    }

    pub fn trigger_janitor(&self) {
        self.janitor.trigger();
    }

    pub fn stop(self) -> WorkerStats {
        self.processor.signal_stop();
        self.janitor.signal_stop();
        WorkerStats {
            processor: self.processor.stop(),
            janitor: self.janitor.stop(),
        }
    }
}
