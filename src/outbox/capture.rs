use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use super::{ChangeSet, OutboxRow};
use crate::aggregate::AggregateRoot;
use crate::clock::{Clock, SystemClock};
use crate::error::CaptureError;
use crate::event::EventEnvelope;

/// Pre-commit hook run by a unit of work with every aggregate it is about to save.
///
/// Anything appended to `changes` is written in the same atomic store call as
/// the aggregates' state. Returning an error aborts the commit.
pub trait SaveChangesInterceptor: Send + Sync {
    fn saving_changes(
        &self,
        aggregates: &mut [&mut dyn AggregateRoot],
        changes: &mut ChangeSet,
    ) -> Result<(), CaptureError>;
}

/// Drains aggregate event buffers into outbox rows.
///
/// Timestamps handed out by one interceptor never go backwards, even if the
/// clock does, so events keep their publish order when sorted by
/// `occurred_at`.
pub struct CaptureInterceptor {
    clock: Arc<dyn Clock>,
    last_stamp: Mutex<Option<DateTime<Utc>>>,
}

impl Default for CaptureInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureInterceptor {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        CaptureInterceptor {
            clock,
            last_stamp: Mutex::new(None),
        }
    }

    fn stamp(&self) -> DateTime<Utc> {
        let mut last = self
            .last_stamp
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        let stamp = match *last {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }

    /// Drain one aggregate's buffer into rows, assigning correlation ids
    /// to events that have none.
    pub fn capture(&self, aggregate: &mut dyn AggregateRoot) -> Result<Vec<OutboxRow>, CaptureError> {
        let events = aggregate.events_mut().take();
        let mut rows = Vec::with_capacity(events.len());

        for mut event in events {
            let meta = event.event_metadata_mut();
            if !meta.has_correlation_id() {
                meta.correlation_id = Uuid::new_v4();
            }

            let event_type = event.event_type();
            let payload_json = EventEnvelope::seal(&*event)
                .and_then(|envelope| envelope.to_json())
                .map_err(|source| CaptureError::Serialize { event_type, source })?;

            rows.push(OutboxRow::new(event_type, payload_json, self.stamp()));
        }

        Ok(rows)
    }
}

impl SaveChangesInterceptor for CaptureInterceptor {
    fn saving_changes(
        &self,
        aggregates: &mut [&mut dyn AggregateRoot],
        changes: &mut ChangeSet,
    ) -> Result<(), CaptureError> {
        for aggregate in aggregates.iter_mut() {
            if !aggregate.has_pending_events() {
                continue;
            }
            let rows = self.capture(&mut **aggregate)?;
            debug!(
                aggregate_id = %aggregate.aggregate_id(),
                rows = rows.len(),
                "captured domain events into outbox"
            );
            for row in rows {
                changes.append_row(row);
            }
        }
        Ok(())
    }
}
