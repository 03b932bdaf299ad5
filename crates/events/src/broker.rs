//! In-memory broker: retained, partitioned channels plus live fan-out.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::bus::{EventBus, Subscription};
use crate::channel::ChannelConfig;
use crate::envelope::EventEnvelope;
use crate::in_memory_bus::InMemoryEventBus;
use crate::log::{LogRecord, PartitionedLog};

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("failed to encode envelope: {0}")]
    Encode(String),

    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

/// Point-in-time counters for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStats {
    pub records: usize,
    pub bytes: u64,
    pub per_partition: Vec<usize>,
}

type Envelope = EventEnvelope<JsonValue>;

/// Broker for development and tests.
///
/// Publishing appends the envelope to its channel's log (enforcing retention)
/// and then hands it to live subscribers. Publishing to a channel that was not
/// declared up front fails with [`BrokerError::UnknownChannel`].
#[derive(Debug)]
pub struct InMemoryBroker {
    channels: Mutex<HashMap<String, PartitionedLog<Envelope>>>,
    live: InMemoryEventBus<Envelope>,
}

impl InMemoryBroker {
    pub fn new(channels: impl IntoIterator<Item = ChannelConfig>) -> Self {
        let channels = channels
            .into_iter()
            .map(|c| (c.name().to_string(), PartitionedLog::new(c)))
            .collect();
        Self {
            channels: Mutex::new(channels),
            live: InMemoryEventBus::new(),
        }
    }

    pub fn publish_at(&self, envelope: Envelope, now: DateTime<Utc>) -> Result<(u32, u64), BrokerError> {
        let size = serde_json::to_vec(&envelope)
            .map_err(|e| BrokerError::Encode(e.to_string()))?
            .len() as u64;

        let position = {
            let mut channels = self
                .channels
                .lock()
                .map_err(|_| BrokerError::Unavailable("channel lock poisoned".into()))?;
            let log = channels
                .get_mut(envelope.channel())
                .ok_or_else(|| BrokerError::UnknownChannel(envelope.channel().to_string()))?;
            let key = envelope.key().to_string();
            log.append_at(&key, envelope.clone(), size, now)
        };

        tracing::debug!(
            channel = envelope.channel(),
            key = envelope.key(),
            partition = position.0,
            offset = position.1,
            "event appended"
        );

        self.live
            .publish(envelope)
            .map_err(|e| BrokerError::Unavailable(e.to_string()))?;
        Ok(position)
    }

    /// Retained records of one partition from `from_offset` on.
    pub fn read(
        &self,
        channel: &str,
        partition: u32,
        from_offset: u64,
    ) -> Result<Vec<LogRecord<Envelope>>, BrokerError> {
        let channels = self
            .channels
            .lock()
            .map_err(|_| BrokerError::Unavailable("channel lock poisoned".into()))?;
        let log = channels
            .get(channel)
            .ok_or_else(|| BrokerError::UnknownChannel(channel.to_string()))?;
        Ok(log.read(partition, from_offset).into_iter().cloned().collect())
    }

    pub fn stats(&self, channel: &str) -> Result<ChannelStats, BrokerError> {
        let channels = self
            .channels
            .lock()
            .map_err(|_| BrokerError::Unavailable("channel lock poisoned".into()))?;
        let log = channels
            .get(channel)
            .ok_or_else(|| BrokerError::UnknownChannel(channel.to_string()))?;
        Ok(ChannelStats {
            records: log.len(),
            bytes: log.total_bytes(),
            per_partition: (0..log.config().partitions()).map(|p| log.partition_len(p)).collect(),
        })
    }
}

impl EventBus<Envelope> for InMemoryBroker {
    type Error = BrokerError;

    fn publish(&self, message: Envelope) -> Result<(), Self::Error> {
        self.publish_at(message, Utc::now()).map(|_| ())
    }

    fn subscribe(&self) -> Subscription<Envelope> {
        self.live.subscribe()
    }
}
