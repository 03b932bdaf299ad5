use chrono::{DateTime, Utc};

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
/// - **keyed**, so that every event about one entity lands on the same partition
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name, doubling as the channel it is published on
    /// (e.g. "product.created").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Partition key. Events sharing a key keep their relative order.
    fn partition_key(&self) -> String;
}
