use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RowError;
use crate::event::EventEnvelope;

/// One captured event awaiting (or past) delivery.
///
/// Rows are created by capture, marked by the processor and deleted by the
/// janitor. Nothing points back at the aggregate that raised the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRow {
    pub id: Uuid,
    pub event_type: String,
    pub payload_json: String,
    pub occurred_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl OutboxRow {
    pub fn new(
        event_type: impl Into<String>,
        payload_json: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        OutboxRow {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            payload_json: payload_json.into(),
            occurred_at,
            processed_at: None,
            last_error: None,
        }
    }

    pub fn is_processed(&self) -> bool {
        self.processed_at.is_some()
    }

    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }

    /// Mark the row delivered. Returns `false` if it already was.
    pub fn mark_processed(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_processed() {
            return false;
        }
        self.processed_at = Some(at);
        self.last_error = None;
        true
    }

    /// Record a processing failure. Processed rows are left untouched.
    pub fn record_error(&mut self, error: &RowError) -> bool {
        if self.is_processed() {
            return false;
        }
        self.last_error = Some(error.to_string());
        true
    }

    /// Record that the janitor could not delete this row. `processed_at` is kept.
    pub fn record_deletion_failure(&mut self, reason: impl Into<String>) {
        let error = RowError::DeleteFailed {
            reason: reason.into(),
        };
        self.last_error = Some(error.to_string());
    }

    pub fn envelope(&self) -> Result<EventEnvelope, serde_json::Error> {
        EventEnvelope::from_json(&self.payload_json)
    }
}
