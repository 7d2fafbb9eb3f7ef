mod capture;
mod in_memory;
mod janitor;
mod processor;
mod publisher;
mod row;
mod store;
mod unit_of_work;

pub use capture::{CaptureInterceptor, SaveChangesInterceptor};
pub use in_memory::InMemoryOutboxStore;
pub use janitor::{JanitorReport, OutboxJanitor};
pub use processor::{OutboxProcessor, ProcessReport};
#[cfg(feature = "emitter")]
pub use publisher::LocalEmitterPublisher;
pub use publisher::{EventPublisher, LogPublisher, LogPublisherError, ResolvedEvent};
pub use row::OutboxRow;
pub use store::{AggregateWrite, ChangeSet, OutboxStore};
pub use unit_of_work::{OutboxRepository, UnitOfWork};
