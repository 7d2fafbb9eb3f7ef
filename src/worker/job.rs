use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::OutboxError;
use crate::outbox::{EventPublisher, OutboxJanitor, OutboxProcessor, OutboxStore};

/// Shared flag asking a running job to stop. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A unit of periodic outbox work.
pub trait OutboxJob: Send {
    fn name(&self) -> &'static str;

    fn execute(&mut self, stop: &StopSignal) -> Result<(), OutboxError>;
}

impl<S, P> OutboxJob for OutboxProcessor<S, P>
where
    S: OutboxStore,
    P: EventPublisher + Send,
{
    fn name(&self) -> &'static str {
        "outbox-processor"
    }

    fn execute(&mut self, stop: &StopSignal) -> Result<(), OutboxError> {
        self.run_until(stop)?;
        Ok(())
    }
}

impl<S: OutboxStore> OutboxJob for OutboxJanitor<S> {
    fn name(&self) -> &'static str {
        "outbox-janitor"
    }

    fn execute(&mut self, stop: &StopSignal) -> Result<(), OutboxError> {
        if stop.is_stopped() {
            return Ok(());
        }
        self.run_once()?;
        Ok(())
    }
}
