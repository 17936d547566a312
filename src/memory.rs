use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{Event, Log, LogError, Result};

/// Reference in-memory [`Log`] backend.
///
/// Events live in one `Vec` per aggregate, each behind its own mutex, so an
/// append only ever contends with operations on the same aggregate. A shared
/// journal records global append order for [`Log::all`]. The stream mutex is
/// the per-aggregate exclusive section from the log contract: the duplicate
/// check, the version check and the append itself happen under it, so
/// concurrent writers to one aggregate serialize and a stale one fails with
/// `Conflict` instead of clobbering the other's write.
///
/// No lock is held across an await point and readers only ever clone fully
/// appended events, so a read racing an append observes either the pre- or
/// post-append stream.
#[derive(Debug, Default)]
pub struct InMemoryLog {
    streams: RwLock<HashMap<String, Arc<Mutex<Vec<Event>>>>>,
    journal: Mutex<Vec<Event>>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&self, aggregate_id: &str) -> Arc<Mutex<Vec<Event>>> {
        // Fast path: stream already exists, shared read lock is enough.
        let existing = self
            .streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(aggregate_id)
            .cloned();

        match existing {
            Some(stream) => stream,
            None => self
                .streams
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(aggregate_id.to_owned())
                .or_default()
                .clone(),
        }
    }
}

#[async_trait]
impl Log for InMemoryLog {
    async fn append(&self, event: Event) -> Result<()> {
        let stream = self.stream(&event.aggregate_id);
        let mut stream = stream.lock().unwrap_or_else(PoisonError::into_inner);

        if stream.iter().any(|stored| stored.event_id == event.event_id) {
            debug!(
                aggregate_id = %event.aggregate_id,
                event_id = %event.event_id,
                "duplicate event id, append is a no-op"
            );
            return Ok(());
        }

        let expected = stream.last().map_or(0, |last| last.aggregate_version) + 1;
        if event.aggregate_version != expected {
            warn!(
                aggregate_id = %event.aggregate_id,
                expected,
                actual = event.aggregate_version,
                "rejecting stale append"
            );
            return Err(LogError::Conflict {
                aggregate_id: event.aggregate_id,
                expected,
                actual: event.aggregate_version,
            });
        }

        debug!(
            aggregate_id = %event.aggregate_id,
            name = %event.name,
            version = event.aggregate_version,
            "event appended"
        );

        // Journal push happens under the stream lock so the global order of
        // one aggregate's events matches their version order.
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        stream.push(event);

        Ok(())
    }

    async fn all_for_aggregate(&self, aggregate_id: &str) -> Result<Vec<Event>> {
        let stream = {
            let streams = self.streams.read().unwrap_or_else(PoisonError::into_inner);
            streams.get(aggregate_id).cloned()
        };

        match stream {
            Some(stream) => Ok(stream
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn all(&self) -> Result<Vec<Event>> {
        Ok(self
            .journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
