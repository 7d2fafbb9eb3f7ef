use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{EventPublisher, OutboxRow, OutboxStore, ResolvedEvent};
use crate::clock::{Clock, SystemClock};
use crate::error::{ProcessError, RowError};
use crate::event::EventRegistry;
use crate::worker::StopSignal;

/// Result of one processor run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessReport {
    pub fetched: usize,
    pub published: usize,
    pub unresolved: usize,
    pub undecodable: usize,
    pub publish_failed: usize,
    /// Rows fetched but not attempted because the run was stopped.
    pub skipped: usize,
    pub interrupted: bool,
}

impl ProcessReport {
    pub fn failed(&self) -> usize {
        self.unresolved + self.undecodable + self.publish_failed
    }

    pub fn attempted(&self) -> usize {
        self.published + self.failed()
    }
}

enum RowOutcome {
    Published,
    Unresolved,
    Undecodable,
    PublishFailed,
}

/// Relays unprocessed outbox rows to the bus, oldest first.
///
/// Each row succeeds or fails on its own; the state of every attempted row is
/// written back in one `update_rows` call at the end of the run. Failed rows
/// stay unprocessed and are retried on every later run.
pub struct OutboxProcessor<S, P> {
    store: S,
    publisher: P,
    registry: Arc<EventRegistry>,
    batch_size: usize,
    clock: Arc<dyn Clock>,
}

impl<S, P> OutboxProcessor<S, P> {
    pub const DEFAULT_BATCH_SIZE: usize = 20;

    pub fn new(store: S, publisher: P, registry: Arc<EventRegistry>) -> Self {
        OutboxProcessor {
            store,
            publisher,
            registry,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            clock: Arc::new(SystemClock),
        }
    }

    /// Set the maximum number of rows fetched per run. Never less than one.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: OutboxStore, P: EventPublisher> OutboxProcessor<S, P> {
    /// Process one batch to completion.
    pub fn run_once(&mut self) -> Result<ProcessReport, ProcessError> {
        self.run_until(&StopSignal::new())
    }

    /// Process one batch, checking `stop` before each row.
    ///
    /// When stopped mid-batch only rows whose attempt finished are persisted.
    pub fn run_until(&mut self, stop: &StopSignal) -> Result<ProcessReport, ProcessError> {
        let mut rows = self
            .store
            .unprocessed(self.batch_size)
            .map_err(ProcessError::Fetch)?;
        rows.truncate(self.batch_size);
        rows.sort_by_key(|row| row.occurred_at);

        let mut report = ProcessReport {
            fetched: rows.len(),
            ..ProcessReport::default()
        };
        let mut attempted = Vec::with_capacity(rows.len());

        for mut row in rows {
            if stop.is_stopped() {
                report.interrupted = true;
                break;
            }
            match self.process_row(&mut row) {
                RowOutcome::Published => report.published += 1,
                RowOutcome::Unresolved => report.unresolved += 1,
                RowOutcome::Undecodable => report.undecodable += 1,
                RowOutcome::PublishFailed => report.publish_failed += 1,
            }
            attempted.push(row);
        }
        report.skipped = report.fetched - attempted.len();

        if !attempted.is_empty() {
            self.store
                .update_rows(&attempted)
                .map_err(|source| ProcessError::Persist {
                    rows: attempted.len(),
                    source,
                })?;
        }

        if report.fetched > 0 {
            info!(
                fetched = report.fetched,
                published = report.published,
                failed = report.failed(),
                skipped = report.skipped,
                "outbox batch processed"
            );
        }
        Ok(report)
    }

    fn process_row(&mut self, row: &mut OutboxRow) -> RowOutcome {
        let (envelope, event) = match self.registry.decode(&row.event_type, &row.payload_json) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(row_id = %row.id, event_type = %row.event_type, error = %err, "outbox row not decodable");
                let outcome = match err {
                    RowError::UnknownEventType { .. } => RowOutcome::Unresolved,
                    _ => RowOutcome::Undecodable,
                };
                row.record_error(&err);
                return outcome;
            }
        };

        let resolved = ResolvedEvent {
            message_id: row.id,
            occurred_at: row.occurred_at,
            envelope,
            event,
        };

        match self.publisher.publish(&resolved) {
            Ok(()) => {
                row.mark_processed(self.clock.now());
                debug!(row_id = %row.id, event_type = %row.event_type, "outbox row published");
                RowOutcome::Published
            }
            Err(err) => {
                let err = RowError::publish_failed(&err);
                warn!(row_id = %row.id, event_type = %row.event_type, error = %err, "outbox publish failed");
                row.record_error(&err);
                RowOutcome::PublishFailed
            }
        }
    }
}
