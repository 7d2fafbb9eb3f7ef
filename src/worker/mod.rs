mod job;
mod thread;

pub use job::{OutboxJob, StopSignal};
pub use thread::{JobStats, JobThread, OutboxWorkers, WorkerStats};
