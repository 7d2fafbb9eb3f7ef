use std::any::Any;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata every domain event carries.
///
/// A nil `correlation_id` means "not yet correlated"; the capture step assigns
/// one before the event is written to the outbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(default)]
    pub correlation_id: Uuid,
    #[serde(default = "EventMetadata::first_version")]
    pub schema_version: u32,
}

impl Default for EventMetadata {
    fn default() -> Self {
        EventMetadata {
            correlation_id: Uuid::nil(),
            schema_version: Self::FIRST_VERSION,
        }
    }
}

impl EventMetadata {
    pub const FIRST_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata with a pre-set correlation id.
    pub fn correlated(correlation_id: Uuid) -> Self {
        EventMetadata {
            correlation_id,
            ..Self::default()
        }
    }

    pub fn with_schema_version(mut self, schema_version: u32) -> Self {
        self.schema_version = schema_version;
        self
    }

    pub fn has_correlation_id(&self) -> bool {
        !self.correlation_id.is_nil()
    }

    fn first_version() -> u32 {
        Self::FIRST_VERSION
    }
}

/// A typed, immutable fact raised by an aggregate.
///
/// `EVENT_TYPE` is the stable tag written to `OutboxRow::event_type` and used to
/// find the decoder again on replay. Changing it orphans already-captured rows.
///
/// Most events keep their metadata in a `#[serde(skip)]` field: the envelope
/// carries it, so the payload holds only event-specific data.
pub trait DomainEvent: Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static {
    const EVENT_TYPE: &'static str;

    fn metadata(&self) -> &EventMetadata;
    fn metadata_mut(&mut self) -> &mut EventMetadata;
}

/// Object-safe view of a [`DomainEvent`], so buffers can hold mixed event types.
pub trait AnyEvent: fmt::Debug + Send + Sync {
    fn event_type(&self) -> &'static str;
    fn event_metadata(&self) -> &EventMetadata;
    fn event_metadata_mut(&mut self) -> &mut EventMetadata;
    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error>;
    fn as_any(&self) -> &dyn Any;
}

impl<E: DomainEvent> AnyEvent for E {
    fn event_type(&self) -> &'static str {
        E::EVENT_TYPE
    }

    fn event_metadata(&self) -> &EventMetadata {
        self.metadata()
    }

    fn event_metadata_mut(&mut self) -> &mut EventMetadata {
        self.metadata_mut()
    }

    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn AnyEvent {
    pub fn is<E: DomainEvent>(&self) -> bool {
        self.as_any().is::<E>()
    }

    pub fn downcast_ref<E: DomainEvent>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }
}

/// Implement [`DomainEvent`] for a struct with an [`EventMetadata`] field.
///
/// ```ignore
/// impl_domain_event!(OrderPlaced, "OrderPlaced", meta);
/// ```
#[macro_export]
macro_rules! impl_domain_event {
    ($ty:ty, $name:expr, $meta:ident) => {
        impl $crate::DomainEvent for $ty {
            const EVENT_TYPE: &'static str = $name;

            fn metadata(&self) -> &$crate::EventMetadata {
                &self.$meta
            }

            fn metadata_mut(&mut self) -> &mut $crate::EventMetadata {
                &mut self.$meta
            }
        }
    };
}
