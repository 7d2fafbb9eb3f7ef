use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::event::{AnyEvent, DomainEvent, EventEnvelope};

/// A row turned back into a typed event, ready to hand to the bus.
///
/// `message_id` is the outbox row id and stays the same across redeliveries,
/// so subscribers can use it (or the correlation id) to drop duplicates.
#[derive(Debug)]
pub struct ResolvedEvent {
    pub message_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub envelope: EventEnvelope,
    pub event: Box<dyn AnyEvent>,
}

impl ResolvedEvent {
    pub fn event_type(&self) -> &str {
        &self.envelope.event_type
    }

    pub fn correlation_id(&self) -> Uuid {
        self.envelope.correlation_id
    }

    pub fn schema_version(&self) -> u32 {
        self.envelope.schema_version
    }

    pub fn downcast_ref<E: DomainEvent>(&self) -> Option<&E> {
        self.event.downcast_ref::<E>()
    }
}

/// The seam to the message bus.
///
/// `Ok(())` must mean the bus has durably accepted the event. Errors are
/// recorded on the row and the event is offered again on the next run.
pub trait EventPublisher {
    type Error: std::error::Error + 'static;

    fn publish(&mut self, event: &ResolvedEvent) -> Result<(), Self::Error>;
}

impl<P: EventPublisher + ?Sized> EventPublisher for Box<P> {
    type Error = P::Error;

    fn publish(&mut self, event: &ResolvedEvent) -> Result<(), Self::Error> {
        (**self).publish(event)
    }
}

#[derive(Debug, Error)]
pub enum LogPublisherError {
    #[error("log publisher buffer poisoned")]
    BufferPoisoned,
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A publisher that logs events through `tracing` or into a shared buffer.
#[derive(Default)]
pub struct LogPublisher {
    buffer: Option<Arc<Mutex<Vec<String>>>>,
}

impl LogPublisher {
    pub fn new() -> Self {
        LogPublisher { buffer: None }
    }

    pub fn with_buffer(buffer: Arc<Mutex<Vec<String>>>) -> Self {
        LogPublisher {
            buffer: Some(buffer),
        }
    }
}

impl EventPublisher for LogPublisher {
    type Error = LogPublisherError;

    fn publish(&mut self, event: &ResolvedEvent) -> Result<(), Self::Error> {
        let envelope = event.envelope.to_json()?;
        if let Some(buffer) = &self.buffer {
            let line = format!("[OUTBOX] {} {} {}", event.message_id, event.event_type(), envelope);
            let mut buffer = buffer
                .lock()
                .map_err(|_| LogPublisherError::BufferPoisoned)?;
            buffer.push(line);
        } else {
            info!(
                message_id = %event.message_id,
                event_type = event.event_type(),
                %envelope,
                "outbox event"
            );
        }
        Ok(())
    }
}

#[cfg(feature = "emitter")]
pub use local_emitter::LocalEmitterPublisher;

#[cfg(feature = "emitter")]
mod local_emitter {
    use event_emitter_rs::EventEmitter;

    use super::{EventPublisher, ResolvedEvent};

    /// Emits each event's envelope JSON on an in-process `EventEmitter`,
    /// under the event's type tag.
    pub struct LocalEmitterPublisher {
        emitter: EventEmitter,
    }

    impl LocalEmitterPublisher {
        pub fn new(emitter: EventEmitter) -> Self {
            LocalEmitterPublisher { emitter }
        }

        pub fn emitter_mut(&mut self) -> &mut EventEmitter {
            &mut self.emitter
        }
    }

    impl EventPublisher for LocalEmitterPublisher {
        type Error = serde_json::Error;

        fn publish(&mut self, event: &ResolvedEvent) -> Result<(), Self::Error> {
            let envelope = event.envelope.to_json()?;
            self.emitter.emit(event.event_type(), envelope);
            Ok(())
        }
    }
}
