mod domain_event;
mod envelope;
mod registry;
mod upcaster;

pub use domain_event::{AnyEvent, DomainEvent, EventMetadata};
pub use envelope::EventEnvelope;
pub use registry::{EventDecoder, EventRegistry};
pub use upcaster::{upcast_envelope, EventUpcaster};
