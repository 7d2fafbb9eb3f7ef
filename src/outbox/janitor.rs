use tracing::{error, info, warn};
use uuid::Uuid;

use super::OutboxStore;
use crate::error::{JanitorError, StoreError};

/// Result of one janitor run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JanitorReport {
    pub selected: usize,
    pub deleted: usize,
}

/// Deletes processed outbox rows in small batches.
///
/// Each batch is deleted all or nothing. If the store refuses a row, the
/// failure is written to that row's `last_error` and returned; nothing is
/// deleted in that run.
pub struct OutboxJanitor<S> {
    store: S,
    batch_size: usize,
}

impl<S: OutboxStore> OutboxJanitor<S> {
    pub const DEFAULT_BATCH_SIZE: usize = 5;

    pub fn new(store: S) -> Self {
        OutboxJanitor {
            store,
            batch_size: Self::DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the maximum number of rows deleted per run. Never less than one.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn run_once(&self) -> Result<JanitorReport, JanitorError> {
        let mut rows = self
            .store
            .processed(self.batch_size)
            .map_err(JanitorError::Fetch)?;
        rows.retain(|row| row.is_processed());
        rows.truncate(self.batch_size);

        if rows.is_empty() {
            return Ok(JanitorReport::default());
        }

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        match self.store.delete_rows(&ids) {
            Ok(deleted) => {
                info!(selected = ids.len(), deleted, "outbox rows cleaned up");
                Ok(JanitorReport {
                    selected: ids.len(),
                    deleted,
                })
            }
            Err(StoreError::DeleteRejected { id, reason }) => {
                if let Err(err) = self.store.record_deletion_failure(id, &reason) {
                    warn!(row_id = %id, error = %err, "failed to record deletion failure");
                }
                error!(row_id = %id, %reason, "outbox row deletion rejected");
                Err(JanitorError::Delete { id, reason })
            }
            Err(err) => {
                error!(error = %err, "outbox cleanup failed");
                Err(JanitorError::Store(err))
            }
        }
    }
}
