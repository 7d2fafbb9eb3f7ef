use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use uuid::Uuid;

use super::{ChangeSet, OutboxRow, OutboxStore};
use crate::error::StoreError;

struct StoredRow {
    seq: u64,
    row: OutboxRow,
}

#[derive(Default)]
struct StoreState {
    aggregates: HashMap<String, Value>,
    rows: Vec<StoredRow>,
    next_seq: u64,
}

impl StoreState {
    fn position(&self, id: Uuid) -> Option<usize> {
        self.rows.iter().position(|s| s.row.id == id)
    }

    fn ordered(&self, processed: bool, limit: usize) -> Vec<OutboxRow> {
        let mut matching: Vec<&StoredRow> = self
            .rows
            .iter()
            .filter(|s| s.row.is_processed() == processed)
            .collect();
        matching.sort_by(|a, b| {
            a.row
                .occurred_at
                .cmp(&b.row.occurred_at)
                .then(a.seq.cmp(&b.seq))
        });
        matching
            .into_iter()
            .take(limit)
            .map(|s| s.row.clone())
            .collect()
    }
}

/// Thread-safe in-memory outbox store.
///
/// Clones share the same storage, so one clone can be handed to the committing
/// code and another to each background worker.
#[derive(Clone, Default)]
pub struct InMemoryOutboxStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row in capture order.
    pub fn rows(&self) -> Result<Vec<OutboxRow>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))?;
        Ok(state.rows.iter().map(|s| s.row.clone()).collect())
    }

    pub fn pending_count(&self) -> Result<usize, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))?;
        Ok(state.rows.iter().filter(|s| !s.row.is_processed()).count())
    }

    pub fn aggregate_count(&self) -> Result<usize, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))?;
        Ok(state.aggregates.len())
    }
}

impl OutboxStore for InMemoryOutboxStore {
    fn commit(&self, changes: ChangeSet) -> Result<(), StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::LockPoisoned("write"))?;

        let (writes, rows) = changes.into_parts();
        for write in writes {
            state.aggregates.insert(write.id, write.state);
        }
        for row in rows {
            let seq = state.next_seq;
            state.next_seq += 1;
            state.rows.push(StoredRow { seq, row });
        }
        Ok(())
    }

    fn load_aggregate(&self, id: &str) -> Result<Option<Value>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))?;
        Ok(state.aggregates.get(id).cloned())
    }

    fn unprocessed(&self, limit: usize) -> Result<Vec<OutboxRow>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))?;
        Ok(state.ordered(false, limit))
    }

    fn processed(&self, limit: usize) -> Result<Vec<OutboxRow>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))?;
        Ok(state.ordered(true, limit))
    }

    fn update_rows(&self, rows: &[OutboxRow]) -> Result<(), StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::LockPoisoned("write"))?;

        for row in rows {
            let Some(index) = state.position(row.id) else {
                continue;
            };
            let stored = &mut state.rows[index].row;
            if stored.is_processed() {
                continue;
            }
            stored.processed_at = row.processed_at;
            stored.last_error = row.last_error.clone();
        }
        Ok(())
    }

    fn record_deletion_failure(&self, id: Uuid, reason: &str) -> Result<(), StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::LockPoisoned("write"))?;

        if let Some(index) = state.position(id) {
            let stored = &mut state.rows[index].row;
            if stored.is_processed() {
                stored.record_deletion_failure(reason);
            }
        }
        Ok(())
    }

    fn delete_rows(&self, ids: &[Uuid]) -> Result<usize, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::LockPoisoned("write"))?;

        for id in ids {
            if let Some(index) = state.position(*id) {
                if !state.rows[index].row.is_processed() {
                    return Err(StoreError::DeleteRejected {
                        id: *id,
                        reason: "row has not been processed".to_string(),
                    });
                }
            }
        }

        let before = state.rows.len();
        state.rows.retain(|s| !ids.contains(&s.row.id));
        Ok(before - state.rows.len())
    }

    fn get_row(&self, id: Uuid) -> Result<Option<OutboxRow>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))?;
        Ok(state.position(id).map(|i| state.rows[i].row.clone()))
    }
}
