mod aggregate_root;
mod buffer;
mod committable;

pub use aggregate_root::AggregateRoot;
pub use buffer::EventBuffer;
pub use committable::Committable;
