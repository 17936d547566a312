use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::Result;

/// One immutable fact that occurred to one aggregate instance.
///
/// An event carries a `name` tag discriminating its type, an opaque
/// JSON-serializable payload, the id of the aggregate it belongs to and the
/// version that aggregate has *after* the event is applied. The first event of
/// a new aggregate has version 1; version 0 means "does not exist yet".
///
/// Events are created with [`Event::new`] from a typed [`EventPayload`] and
/// the payload is recovered with [`Event::payload`]. Once appended to a log an
/// event is never updated or deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Globally unique id, used to de-duplicate retried appends.
    pub event_id: String,

    /// The type of event, e.g. `ItemStocked`, `BoardCreated`.
    pub name: String,

    /// The aggregate instance this event belongs to; stream partition key.
    pub aggregate_id: String,

    /// Version of the aggregate after this event is applied.
    pub aggregate_version: u64,

    /// The payload of the event, stored opaquely.
    payload: serde_json::Value,

    /// Occurrence time, assigned by the caller at construction.
    pub timestamp: DateTime<Utc>,

    /// Optional link to the command or event chain that this event is part of.
    pub correlation_id: Option<String>,

    /// Optional id of the event or command that directly caused this one.
    pub causation_id: Option<String>,
}

impl Event {
    /// Creates a new event for `aggregate_id` at `aggregate_version`.
    ///
    /// The version must be the caller's observed current version plus one; the
    /// log enforces that precondition at append time. The event id defaults to
    /// a random UUID, which resolves de-duplication in favor of "every call is
    /// a distinct fact" — callers wanting idempotent retries override it with
    /// [`Event::with_event_id`].
    pub fn new<T: EventPayload>(
        aggregate_id: impl Into<String>,
        aggregate_version: u64,
        payload: T,
    ) -> Result<Self> {
        Ok(Self {
            event_id: Uuid::new_v4().to_string(),
            name: payload.name(),
            aggregate_id: aggregate_id.into(),
            aggregate_version,
            payload: serde_json::to_value(payload)?,
            timestamp: Utc::now(),
            correlation_id: None,
            causation_id: None,
        })
    }

    /// Replaces the generated event id with a caller-chosen one.
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = event_id.into();
        self
    }

    /// Replaces the construction-time timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Sets the correlation id carried opaquely through the log.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Links this event to the event that caused it: the cause's id becomes
    /// the causation id, and its correlation id (or, failing that, its event
    /// id) becomes the correlation id.
    pub fn caused_by(mut self, cause: &Event) -> Self {
        self.causation_id = Some(cause.event_id.clone());
        self.correlation_id = cause
            .correlation_id
            .clone()
            .or_else(|| Some(cause.event_id.clone()));
        self
    }

    /// Deserializes the payload into a concrete payload type.
    pub fn payload<T: EventPayload>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }

    /// The stored payload, untyped. For audit trails and read-model builders
    /// that walk heterogeneous streams.
    pub fn payload_json(&self) -> &serde_json::Value {
        &self.payload
    }
}

/// The typed data of an event, representing the change the event made to the
/// state of an aggregate.
///
/// Implement this for each payload type (usually one enum per aggregate type)
/// and have `name` return the tag stored on the event. The `event_names!`
/// macro writes the enum case for you.
pub trait EventPayload: Serialize + DeserializeOwned + Clone {
    /// Name tag stored on the event, e.g. `"ItemStocked"`.
    fn name(&self) -> String;
}

/// Implements [`EventPayload`] for an enum by mapping each variant to its
/// stored name tag.
///
/// ```ignore
/// event_names! {
///     ItemEvent {
///         Stocked => "ItemStocked",
///         Bought => "ItemBought",
///     }
/// }
/// ```
#[macro_export]
macro_rules! event_names {
    (
        $Payload:ident {
            $($Variant:ident => $name:literal),* $(,)?
        }
    ) => {
        impl $crate::EventPayload for $Payload {
            fn name(&self) -> String {
                match self {
                    $( $Payload::$Variant { .. } => $name.to_string(), )*
                }
            }
        }
    };
}
