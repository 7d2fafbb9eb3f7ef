use thiserror::Error;
use uuid::Uuid;

/// Failures reported by an [`OutboxStore`](crate::OutboxStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("outbox store lock poisoned during {0}")]
    LockPoisoned(&'static str),
    #[error("outbox row {id} cannot be deleted: {reason}")]
    DeleteRejected { id: Uuid, reason: String },
    #[error("stored state for aggregate {id} could not be decoded: {message}")]
    Decode { id: String, message: String },
    #[error("outbox store unavailable: {0}")]
    Unavailable(String),
}

/// Failures while turning buffered events into outbox rows.
///
/// Any of these aborts the surrounding commit.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to serialize event {event_type}: {source}")]
    Serialize {
        event_type: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to snapshot aggregate {aggregate_id}: {source}")]
    Snapshot {
        aggregate_id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Row-local failure. Its `Display` text is what lands in `OutboxRow::last_error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("unknown event type '{event_type}'")]
    UnknownEventType { event_type: String },
    #[error("malformed payload for '{event_type}': {message}")]
    MalformedPayload { event_type: String, message: String },
    #[error("publish failed ({kind}): {message}")]
    PublishFailed { kind: String, message: String },
    #[error("delete failed: {reason}")]
    DeleteFailed { reason: String },
}

impl RowError {
    /// Describe a publisher failure by its error type and message.
    pub fn publish_failed<E: std::error::Error>(err: &E) -> Self {
        let kind = std::any::type_name::<E>()
            .rsplit("::")
            .next()
            .unwrap_or("Error")
            .to_string();
        RowError::PublishFailed {
            kind,
            message: err.to_string(),
        }
    }
}

/// Batch-level processor failures. Row failures never surface here.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to fetch unprocessed outbox rows: {0}")]
    Fetch(#[source] StoreError),
    #[error("failed to persist outbox batch of {rows} rows: {source}")]
    Persist {
        rows: usize,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Error)]
pub enum JanitorError {
    #[error("failed to fetch processed outbox rows: {0}")]
    Fetch(#[source] StoreError),
    #[error("failed to delete outbox row {id}: {reason}")]
    Delete { id: Uuid, reason: String },
    #[error("failed to delete processed outbox rows: {0}")]
    Store(#[source] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Failures starting a background job thread.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("invalid outbox config: {0}")]
    Config(#[from] ConfigError),
    #[error("job interval must be greater than zero")]
    ZeroInterval,
    #[error("failed to spawn job thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Umbrella error for scheduled outbox jobs.
#[derive(Debug, Error)]
pub enum OutboxError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Janitor(#[from] JanitorError),
    #[error(transparent)]
    Commit(#[from] CommitError),
}
