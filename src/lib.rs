//! Minimal event-sourcing substrate: an immutable [`Event`] record, an
//! append-only [`Log`] keyed by aggregate identity, and a generic
//! reconstitution fold that derives current aggregate state from an event
//! stream.
//!
//! The log is the sole source of truth. A command handler reads an
//! aggregate's stream, folds it with [`reconstitute`] (or [`load`]), computes
//! a new event against that state and appends it with the observed version
//! plus one. `append` enforces that precondition, so two concurrent handlers
//! can never silently clobber each other's writes: the stale one gets a
//! [`LogError::Conflict`] and re-reads. Retried appends carrying the same
//! `event_id` are de-duplicated instead of failing.
//!
//! [`InMemoryLog`] is the reference backend; anything that satisfies the
//! [`Log`] trait can stand in for it.

mod aggregate;
mod error;
mod event;
mod log;
mod memory;

pub use aggregate::{Aggregate, Reconstituted, load, reconstitute};
pub use error::{LogError, Result};
pub use event::{Event, EventPayload};
pub use log::Log;
pub use memory::InMemoryLog;
pub use uuid::Uuid;
