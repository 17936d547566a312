use thiserror::Error;

/// Errors surfaced by the log and by the command layers built on top of it.
///
/// Only `Conflict` is recoverable by design: the caller re-reads the stream,
/// recomputes its event against the fresh state and appends again. A duplicate
/// `event_id` is not an error at all; the log treats it as an idempotent retry
/// and reports success without appending.
#[derive(Error, Debug)]
pub enum LogError {
    /// Version precondition failed on append. `expected` is the version the
    /// stream would have accepted, `actual` is the version submitted.
    #[error(
        "concurrency conflict for aggregate {aggregate_id}: expected version {expected}, got {actual}"
    )]
    Conflict {
        aggregate_id: String,
        expected: u64,
        actual: u64,
    },

    /// Malformed command or event shape, rejected before it reaches the log.
    #[error("validation failed for aggregate {aggregate_id}: {reason}")]
    Validation {
        aggregate_id: String,
        reason: String,
    },

    /// Reconstitution produced no aggregate for an operation that requires one.
    #[error("aggregate '{0}' not found")]
    NotFound(String),

    /// Failed to (de)serialize an event payload.
    #[error("failed to serialize event payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Backend I/O failure, propagated unchanged. The in-memory backend never
    /// produces this class.
    #[error("log storage operation failed for aggregate {aggregate_id}: {source}")]
    Storage {
        aggregate_id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl LogError {
    /// Whether the caller should re-read current state and retry the command.
    pub fn is_conflict(&self) -> bool {
        matches!(self, LogError::Conflict { .. })
    }
}

/// Result alias within the library.
pub type Result<T, E = LogError> = std::result::Result<T, E>;
