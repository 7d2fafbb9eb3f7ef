use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{AnyEvent, EventMetadata};

/// Tagged wire form of a captured event: explicit type tag, metadata, and the
/// event's own fields under `payload`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default = "first_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub correlation_id: Uuid,
    pub payload: Value,
}

fn first_version() -> u32 {
    EventMetadata::FIRST_VERSION
}

impl EventEnvelope {
    pub fn seal(event: &dyn AnyEvent) -> Result<Self, serde_json::Error> {
        let meta = event.event_metadata();
        Ok(EventEnvelope {
            event_type: event.event_type().to_string(),
            schema_version: meta.schema_version,
            correlation_id: meta.correlation_id,
            payload: event.to_payload()?,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn metadata(&self) -> EventMetadata {
        EventMetadata {
            correlation_id: self.correlation_id,
            schema_version: self.schema_version,
        }
    }
}
