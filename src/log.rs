use async_trait::async_trait;

use crate::{Event, Result};

/// The append-only event log, sole source of truth of the system.
///
/// Any backend (in-memory, file, network) satisfies this exact contract:
///
/// - `append` accepts an event iff its `aggregate_version` is the stream's
///   current version plus one, and is idempotent for retried `event_id`s;
/// - `all_for_aggregate` returns one aggregate's stream in version order;
/// - `all` returns every event in append order, for audit and read-model
///   rebuilding.
///
/// Implementations must serialize appends per aggregate so that a version
/// check and the append it guards are atomic, and must never expose a
/// half-written event to a concurrent reader. Appends to different aggregates
/// are expected not to contend.
#[async_trait]
pub trait Log: Send + Sync {
    /// Appends one event.
    ///
    /// Fails with [`LogError::Conflict`](crate::LogError::Conflict) when the
    /// version precondition does not hold; the stream is left unchanged and
    /// the caller is expected to re-read, recompute and retry. An event whose
    /// `event_id` is already present in the same stream is dropped and the
    /// call reports success.
    async fn append(&self, event: Event) -> Result<()>;

    /// All events for one aggregate, ascending by `aggregate_version`. An
    /// aggregate that has never been written yields an empty vector, not an
    /// error.
    async fn all_for_aggregate(&self, aggregate_id: &str) -> Result<Vec<Event>>;

    /// Every event ever appended, in append order. Stable across repeated
    /// calls.
    async fn all(&self) -> Result<Vec<Event>>;

    /// Current version of an aggregate: the version of the last event in its
    /// stream, or 0 when the stream is empty.
    async fn current_version(&self, aggregate_id: &str) -> Result<u64> {
        let events = self.all_for_aggregate(aggregate_id).await?;
        Ok(events.last().map_or(0, |event| event.aggregate_version))
    }
}
