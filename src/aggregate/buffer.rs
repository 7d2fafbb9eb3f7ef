use std::fmt;
use std::mem;

use crate::event::{AnyEvent, DomainEvent};

/// Ordered list of events an aggregate has raised but not yet committed.
///
/// The buffer is owned by exactly one aggregate and is not `Clone`. It is
/// drained by the capture step on every commit, so its contents never outlive
/// the transaction that produced them.
#[derive(Default)]
pub struct EventBuffer {
    events: Vec<Box<dyn AnyEvent>>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a typed event.
    pub fn publish<E: DomainEvent>(&mut self, event: E) {
        self.events.push(Box::new(event));
    }

    pub fn push(&mut self, event: Box<dyn AnyEvent>) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn AnyEvent> {
        self.events.iter().map(|e| e.as_ref())
    }

    /// Read and clear in one step.
    pub fn take(&mut self) -> Vec<Box<dyn AnyEvent>> {
        mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl fmt::Debug for EventBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.events.iter().map(|e| e.event_type()))
            .finish()
    }
}
