use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::EventId;

/// Envelope for a published event, carrying channel + ordering metadata.
///
/// This is the unit appended to a channel partition.
///
/// Notes:
/// - `key` selects the partition; all events for one entity share a key.
/// - `sequence_number` is the entity version the event was produced at. A
///   removal event carries the version after the last one, so numbers strictly
///   increase per key.
/// - `payload` is the domain-agnostic event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: EventId,
    channel: String,
    key: String,

    /// Strictly increasing position for this key.
    sequence_number: u64,
    occurred_at: DateTime<Utc>,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: EventId,
        channel: impl Into<String>,
        key: impl Into<String>,
        sequence_number: u64,
        occurred_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            channel: channel.into(),
            key: key.into(),
            sequence_number,
            occurred_at,
            payload,
        }
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }

    /// Swap the payload while keeping the metadata, e.g. to serialize it.
    pub fn map_payload<F, T>(self, f: F) -> EventEnvelope<T>
    where
        F: FnOnce(E) -> T,
    {
        EventEnvelope {
            event_id: self.event_id,
            channel: self.channel,
            key: self.key,
            sequence_number: self.sequence_number,
            occurred_at: self.occurred_at,
            payload: f(self.payload),
        }
    }
}
