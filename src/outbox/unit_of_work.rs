use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{CaptureInterceptor, ChangeSet, OutboxStore, SaveChangesInterceptor};
use crate::aggregate::{AggregateRoot, Committable};
use crate::clock::Clock;
use crate::error::{CaptureError, CommitError, StoreError};

/// Commits aggregates and their captured events through an [`OutboxStore`].
///
/// Every commit runs the registered interceptors first (by default a
/// [`CaptureInterceptor`]), then writes business state and outbox rows in a
/// single `OutboxStore::commit` call.
///
/// ```ignore
/// let repo = OutboxRepository::new(InMemoryOutboxStore::new());
/// let mut order = Order::place("order-1", 4200);
/// repo.commit(&mut order)?;
/// ```
#[derive(Clone)]
pub struct OutboxRepository<S> {
    store: S,
    interceptors: Vec<Arc<dyn SaveChangesInterceptor>>,
}

impl<S: OutboxStore> OutboxRepository<S> {
    pub fn new(store: S) -> Self {
        OutboxRepository {
            store,
            interceptors: vec![Arc::new(CaptureInterceptor::new())],
        }
    }

    /// Like [`new`](Self::new), with capture timestamps taken from `clock`.
    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        OutboxRepository {
            store,
            interceptors: vec![Arc::new(CaptureInterceptor::with_clock(clock))],
        }
    }

    /// Add a pre-commit hook that runs after the ones already registered.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn SaveChangesInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn begin(&self) -> UnitOfWork<'_, S> {
        UnitOfWork {
            repository: self,
            tracked: Vec::new(),
        }
    }

    /// Commit one aggregate, or several at once via a slice, array or `Vec` of
    /// `&mut dyn AggregateRoot`.
    pub fn commit<C: Committable + ?Sized>(&self, target: &mut C) -> Result<(), CommitError> {
        let mut aggregates = target.aggregates_mut();
        self.save(&mut aggregates[..])
    }

    /// Load an aggregate's business state. Its event buffer starts empty.
    pub fn load<A>(&self, id: &str) -> Result<Option<A>, StoreError>
    where
        A: AggregateRoot + DeserializeOwned,
    {
        let Some(state) = self.store.load_aggregate(id)? else {
            return Ok(None);
        };
        serde_json::from_value(state)
            .map(Some)
            .map_err(|e| StoreError::Decode {
                id: id.to_string(),
                message: e.to_string(),
            })
    }

    fn save(&self, aggregates: &mut [&mut dyn AggregateRoot]) -> Result<(), CommitError> {
        let mut changes = ChangeSet::new();

        for interceptor in &self.interceptors {
            interceptor.saving_changes(aggregates, &mut changes)?;
        }

        for aggregate in aggregates.iter() {
            let aggregate_id = aggregate.aggregate_id();
            let state = aggregate
                .snapshot()
                .map_err(|source| CaptureError::Snapshot {
                    aggregate_id: aggregate_id.clone(),
                    source,
                })?;
            changes.upsert(aggregate_id, state);
        }

        let rows = changes.row_count();
        self.store.commit(changes)?;
        info!(aggregates = aggregates.len(), rows, "committed unit of work");
        Ok(())
    }
}

/// An explicit transaction over several aggregates.
///
/// Nothing is written until [`commit`](UnitOfWork::commit). Dropping or
/// rolling back the unit of work writes nothing.
pub struct UnitOfWork<'a, S> {
    repository: &'a OutboxRepository<S>,
    tracked: Vec<&'a mut dyn AggregateRoot>,
}

impl<'a, S: OutboxStore> UnitOfWork<'a, S> {
    pub fn track(&mut self, aggregate: &'a mut dyn AggregateRoot) -> &mut Self {
        self.tracked.push(aggregate);
        self
    }

    pub fn tracked(&self) -> usize {
        self.tracked.len()
    }

    pub fn commit(mut self) -> Result<(), CommitError> {
        self.repository.save(&mut self.tracked[..])
    }

    /// Discard the transaction, including every tracked aggregate's pending events.
    pub fn rollback(self) {
        for aggregate in self.tracked {
            aggregate.clear_events();
        }
        debug!("rolled back unit of work");
    }
}
