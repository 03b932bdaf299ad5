//! EventPublisher: turns product lifecycle events into envelopes on a bus.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, error};

use stockroom_core::EventId;
use stockroom_events::{Event, EventBus, EventEnvelope, Subscription};
use stockroom_products::ProductEvent;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("payload serialization failed: {0}")]
    Serialization(String),

    #[error("event bus rejected publish: {0}")]
    Bus(String),
}

/// Publish outcome counters since startup.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PublisherStats {
    pub published: u64,
    pub failed: u64,
}

/// Build the wire envelope for a product event.
///
/// Channel = event type, key = product id, sequence number = product version,
/// payload = JSON product snapshot.
pub fn to_envelope(event: &ProductEvent) -> Result<EventEnvelope<JsonValue>, PublishError> {
    let payload = serde_json::to_value(event.product())
        .map_err(|e| PublishError::Serialization(e.to_string()))?;

    Ok(EventEnvelope::new(
        EventId::new(),
        event.event_type(),
        event.partition_key(),
        event.sequence_number(),
        event.occurred_at(),
        payload,
    ))
}

/// Publishes product events on any envelope bus.
///
/// Publication happens after the store commit and is best-effort: [`emit`]
/// never fails the caller. A failure is logged and counted and the event is
/// lost (at-most-once).
///
/// [`emit`]: ProductEventPublisher::emit
#[derive(Debug)]
pub struct ProductEventPublisher<B> {
    bus: B,
    published: AtomicU64,
    failed: AtomicU64,
}

impl<B> ProductEventPublisher<B>
where
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            published: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Publish and report failure to the caller.
    pub fn try_publish(&self, event: &ProductEvent) -> Result<(), PublishError> {
        let envelope = to_envelope(event)?;
        self.bus
            .publish(envelope)
            .map_err(|e| PublishError::Bus(e.to_string()))
    }

    /// Publish best-effort.
    pub fn emit(&self, event: ProductEvent) {
        match self.try_publish(&event) {
            Ok(()) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                debug!(
                    channel = event.event_type(),
                    key = %event.partition_key(),
                    version = event.sequence_number(),
                    "product event published"
                );
            }
            Err(err) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    channel = event.event_type(),
                    key = %event.partition_key(),
                    version = event.sequence_number(),
                    error = %err,
                    "product event lost after commit"
                );
            }
        }
    }

    pub fn subscribe(&self) -> Subscription<EventEnvelope<JsonValue>> {
        self.bus.subscribe()
    }

    pub fn stats(&self) -> PublisherStats {
        PublisherStats {
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use stockroom_core::ProductId;
    use stockroom_events::{ChannelConfig, InMemoryBroker, RetentionPolicy};
    use stockroom_products::{CHANNELS, NewProduct, Product};

    use super::*;

    fn event() -> ProductEvent {
        let draft = NewProduct::new("Widget", Decimal::from_str("9.99").unwrap(), 5)
            .with_sku("W-1")
            .validate()
            .unwrap();
        let product = Product::create(ProductId::new(), draft, Utc::now());
        ProductEvent::created(product.view(), Utc::now())
    }

    fn broker(channels: &[&str]) -> Arc<InMemoryBroker> {
        Arc::new(InMemoryBroker::new(
            channels
                .iter()
                .map(|c| ChannelConfig::new(*c, 3, RetentionPolicy::default())),
        ))
    }

    #[test]
    fn envelope_carries_channel_key_version_and_snapshot() {
        let event = event();
        let envelope = to_envelope(&event).unwrap();

        assert_eq!(envelope.channel(), "product.created");
        assert_eq!(envelope.key(), event.product().id.to_string());
        assert_eq!(envelope.sequence_number(), 1);
        assert_eq!(envelope.payload()["sku"], "W-1");
        assert_eq!(envelope.payload()["price"], "9.99");
        assert_eq!(envelope.payload()["available"], true);
    }

    #[test]
    fn emit_counts_successes() {
        let publisher = ProductEventPublisher::new(broker(&CHANNELS));
        let sub = publisher.subscribe();

        publisher.emit(event());

        assert_eq!(publisher.stats(), PublisherStats { published: 1, failed: 0 });
        assert_eq!(sub.try_recv().unwrap().channel(), "product.created");
    }

    #[test]
    fn emit_swallows_and_counts_failures() {
        // No channels declared: every publish is rejected.
        let publisher = ProductEventPublisher::new(broker(&[]));

        publisher.emit(event());

        assert_eq!(publisher.stats(), PublisherStats { published: 0, failed: 1 });
        assert!(publisher.try_publish(&event()).is_err());
    }
}
