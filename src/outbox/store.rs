use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::OutboxRow;
use crate::error::StoreError;

/// Business state for one aggregate, written in the same commit as its rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateWrite {
    pub id: String,
    pub state: Value,
}

/// Everything a single commit will write: business upserts plus new outbox rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    writes: Vec<AggregateWrite>,
    rows: Vec<OutboxRow>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an aggregate's state. A later upsert for the same id replaces it.
    pub fn upsert(&mut self, id: impl Into<String>, state: Value) {
        let id = id.into();
        match self.writes.iter_mut().find(|w| w.id == id) {
            Some(write) => write.state = state,
            None => self.writes.push(AggregateWrite { id, state }),
        }
    }

    pub fn append_row(&mut self, row: OutboxRow) {
        self.rows.push(row);
    }

    pub fn writes(&self) -> &[AggregateWrite] {
        &self.writes
    }

    pub fn rows(&self) -> &[OutboxRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.rows.is_empty()
    }

    pub fn into_parts(self) -> (Vec<AggregateWrite>, Vec<OutboxRow>) {
        (self.writes, self.rows)
    }
}

/// Durable home of aggregates and outbox rows.
///
/// `commit` must apply the whole change set or nothing. `unprocessed` returns
/// rows ordered by `occurred_at` ascending; implementations break ties in
/// insertion order.
pub trait OutboxStore: Send + Sync {
    fn commit(&self, changes: ChangeSet) -> Result<(), StoreError>;

    fn load_aggregate(&self, id: &str) -> Result<Option<Value>, StoreError>;

    fn unprocessed(&self, limit: usize) -> Result<Vec<OutboxRow>, StoreError>;

    /// Processed rows, oldest first.
    fn processed(&self, limit: usize) -> Result<Vec<OutboxRow>, StoreError>;

    /// Persist `processed_at`/`last_error` for the given rows in one write.
    /// Rows already processed in the store are left untouched.
    fn update_rows(&self, rows: &[OutboxRow]) -> Result<(), StoreError>;

    /// Note on a processed row that deleting it failed. `processed_at` is kept.
    /// Unknown and unprocessed rows are ignored.
    fn record_deletion_failure(&self, id: Uuid, reason: &str) -> Result<(), StoreError>;

    /// Delete processed rows, all or nothing. Returns how many were removed.
    fn delete_rows(&self, ids: &[Uuid]) -> Result<usize, StoreError>;

    fn get_row(&self, id: Uuid) -> Result<Option<OutboxRow>, StoreError>;
}

impl<S: OutboxStore + ?Sized> OutboxStore for Arc<S> {
    fn commit(&self, changes: ChangeSet) -> Result<(), StoreError> {
        (**self).commit(changes)
    }

    fn load_aggregate(&self, id: &str) -> Result<Option<Value>, StoreError> {
        (**self).load_aggregate(id)
    }

    fn unprocessed(&self, limit: usize) -> Result<Vec<OutboxRow>, StoreError> {
        (**self).unprocessed(limit)
    }

    fn processed(&self, limit: usize) -> Result<Vec<OutboxRow>, StoreError> {
        (**self).processed(limit)
    }

    fn update_rows(&self, rows: &[OutboxRow]) -> Result<(), StoreError> {
        (**self).update_rows(rows)
    }

    fn record_deletion_failure(&self, id: Uuid, reason: &str) -> Result<(), StoreError> {
        (**self).record_deletion_failure(id, reason)
    }

    fn delete_rows(&self, ids: &[Uuid]) -> Result<usize, StoreError> {
        (**self).delete_rows(ids)
    }

    fn get_row(&self, id: Uuid) -> Result<Option<OutboxRow>, StoreError> {
        (**self).get_row(id)
    }
}
