use std::fmt::Debug;

use crate::{Event, EventPayload, Log, Result};

/// State that can be derived by folding an aggregate's event stream.
///
/// An aggregate has no stored existence of its own: its identity is the
/// `aggregate_id` of its stream and its state is recomputed on demand by
/// [`reconstitute`]. Implement this once per aggregate type; the fold itself
/// is shared.
///
/// `Default` is the defined empty state the fold starts from. `applicable`
/// names the events this aggregate folds; anything else in the stream is
/// skipped, not an error, so unrelated event types can share a stream.
pub trait Aggregate: Debug + Default + Send + Sync {
    /// The typed payload this aggregate folds.
    type Event: EventPayload;

    /// Whether an event with this name is relevant to this aggregate type.
    fn applicable(name: &str) -> bool;

    /// Folds one applicable event into the state.
    fn apply(&mut self, event: &Self::Event);

    /// Whether the folded state denotes an aggregate that was actually
    /// created, as opposed to the empty starting state. Domains where the
    /// distinction matters (a board with no name was never created) override
    /// this; the default says any applied event creates the aggregate.
    fn created(&self) -> bool {
        true
    }
}

/// An aggregate state together with the stream version it was derived from.
///
/// The version is the `aggregate_version` of the last event in the stream,
/// applicable or not — it is what a command handler passes back (plus one)
/// when appending, closing the optimistic-concurrency loop.
#[derive(Clone, Debug, PartialEq)]
pub struct Reconstituted<A> {
    pub state: A,
    pub version: u64,
}

impl<A: Aggregate> Reconstituted<A> {
    /// Folds further events into this state, e.g. the suffix appended since
    /// the state was loaded. Folding a prefix and then the remaining suffix
    /// yields the same state as folding the whole stream at once.
    pub fn apply_events(&mut self, events: &[Event]) -> Result<()> {
        for event in events {
            if A::applicable(&event.name) {
                self.state.apply(&event.payload::<A::Event>()?);
            }
            self.version = event.aggregate_version;
        }
        Ok(())
    }
}

/// Derives current aggregate state by folding an event stream in version
/// order.
///
/// Returns `Ok(None)` when the stream holds no applicable events or when the
/// folded state reports it was never [`created`](Aggregate::created) — "no
/// such aggregate" is an absent result here, never an error. Callers that
/// require the aggregate to exist turn `None` into
/// [`LogError::NotFound`](crate::LogError::NotFound).
pub fn reconstitute<A: Aggregate>(events: &[Event]) -> Result<Option<Reconstituted<A>>> {
    let Some(last) = events.last() else {
        return Ok(None);
    };

    let mut state = A::default();
    let mut applied = false;
    for event in events {
        if !A::applicable(&event.name) {
            continue;
        }
        state.apply(&event.payload::<A::Event>()?);
        applied = true;
    }

    if !applied || !state.created() {
        return Ok(None);
    }

    Ok(Some(Reconstituted {
        state,
        version: last.aggregate_version,
    }))
}

/// Reads one aggregate's stream from the log and reconstitutes it.
pub async fn load<A, L>(log: &L, aggregate_id: &str) -> Result<Option<Reconstituted<A>>>
where
    A: Aggregate,
    L: Log + ?Sized,
{
    let events = log.all_for_aggregate(aggregate_id).await?;
    reconstitute::<A>(&events)
}
