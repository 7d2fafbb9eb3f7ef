use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use tracing::warn;

use super::upcaster::{upcast_envelope, EventUpcaster};
use super::{AnyEvent, DomainEvent, EventEnvelope};
use crate::error::RowError;

type DecodeFn = fn(Value) -> Result<Box<dyn AnyEvent>, serde_json::Error>;

fn decode_as<E: DomainEvent>(payload: Value) -> Result<Box<dyn AnyEvent>, serde_json::Error> {
    let event: E = serde_json::from_value(payload)?;
    Ok(Box::new(event))
}

/// Turns an envelope payload back into one concrete event type.
#[derive(Clone, Copy)]
pub struct EventDecoder {
    event_type: &'static str,
    decode: DecodeFn,
}

impl EventDecoder {
    pub fn of<E: DomainEvent>() -> Self {
        EventDecoder {
            event_type: E::EVENT_TYPE,
            decode: decode_as::<E>,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.event_type
    }

    /// Decode the payload and restore the envelope's metadata onto the event.
    pub fn decode(&self, envelope: &EventEnvelope) -> Result<Box<dyn AnyEvent>, serde_json::Error> {
        let mut event = (self.decode)(envelope.payload.clone())?;
        *event.event_metadata_mut() = envelope.metadata();
        Ok(event)
    }
}

impl fmt::Debug for EventDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDecoder")
            .field("event_type", &self.event_type)
            .finish()
    }
}

/// Explicit table of known event types, keyed by their stable tag.
///
/// ```ignore
/// let registry = EventRegistry::new()
///     .register::<OrderPlaced>()
///     .register::<OrderShipped>();
/// ```
#[derive(Clone, Debug, Default)]
pub struct EventRegistry {
    decoders: HashMap<&'static str, EventDecoder>,
    upcasters: Vec<EventUpcaster>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event type under its `EVENT_TYPE` tag.
    pub fn register<E: DomainEvent>(mut self) -> Self {
        if self
            .decoders
            .insert(E::EVENT_TYPE, EventDecoder::of::<E>())
            .is_some()
        {
            warn!(event_type = E::EVENT_TYPE, "event type registered twice, keeping the last one");
        }
        self
    }

    pub fn with_upcaster(mut self, upcaster: EventUpcaster) -> Self {
        self.upcasters.push(upcaster);
        self
    }

    pub fn resolve(&self, event_type: &str) -> Option<&EventDecoder> {
        self.decoders.get(event_type)
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    pub fn upcasters(&self) -> &[EventUpcaster] {
        &self.upcasters
    }

    /// Resolve, parse, upcast and decode a stored payload.
    ///
    /// Returns the upcast envelope alongside the typed event.
    pub fn decode(
        &self,
        event_type: &str,
        payload_json: &str,
    ) -> Result<(EventEnvelope, Box<dyn AnyEvent>), RowError> {
        let decoder = self
            .resolve(event_type)
            .ok_or_else(|| RowError::UnknownEventType {
                event_type: event_type.to_string(),
            })?;

        let malformed = |message: String| RowError::MalformedPayload {
            event_type: event_type.to_string(),
            message,
        };

        let envelope = EventEnvelope::from_json(payload_json).map_err(|e| malformed(e.to_string()))?;
        if envelope.event_type != event_type {
            return Err(malformed(format!(
                "envelope is tagged '{}'",
                envelope.event_type
            )));
        }

        let envelope = upcast_envelope(envelope, &self.upcasters);
        let event = decoder
            .decode(&envelope)
            .map_err(|e| malformed(e.to_string()))?;
        Ok((envelope, event))
    }
}
