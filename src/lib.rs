//! Transactional outbox for domain events.
//!
//! Aggregates buffer the events they raise. Committing an aggregate through an
//! [`OutboxRepository`] writes its state and one [`OutboxRow`] per event in a
//! single store call. An [`OutboxProcessor`] later relays the rows to an
//! [`EventPublisher`] in occurrence order, and an [`OutboxJanitor`] deletes the
//! rows that were delivered.

mod aggregate;
mod clock;
mod config;
mod error;
mod event;
mod outbox;
mod worker;

pub use aggregate::{AggregateRoot, Committable, EventBuffer};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::OutboxConfig;
pub use error::{
    CaptureError, CommitError, ConfigError, JanitorError, OutboxError, ProcessError, RowError,
    StoreError, WorkerError,
};
pub use event::{
    upcast_envelope, AnyEvent, DomainEvent, EventDecoder, EventEnvelope, EventMetadata,
    EventRegistry, EventUpcaster,
};
#[cfg(feature = "emitter")]
pub use outbox::LocalEmitterPublisher;
pub use outbox::{
    AggregateWrite, CaptureInterceptor, ChangeSet, EventPublisher, InMemoryOutboxStore,
    JanitorReport, LogPublisher, LogPublisherError, OutboxJanitor, OutboxProcessor,
    OutboxRepository, OutboxRow, OutboxStore, ProcessReport, ResolvedEvent,
    SaveChangesInterceptor, UnitOfWork,
};
pub use worker::{JobStats, JobThread, OutboxJob, OutboxWorkers, StopSignal, WorkerStats};

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
