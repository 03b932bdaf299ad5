//! Redis Streams-backed event bus.
//!
//! Layout:
//! - **Stream key**: `{prefix}:{channel}:{partition}`, one stream per channel
//!   partition, so per-key order is the stream order.
//! - **Time retention**: every `XADD` carries `MINID ~ <now - max_age>`.
//! - **Size retention**: after each append the partition is trimmed with
//!   `XTRIM MAXLEN ~ n`, where `n` is the partition's share of the channel byte
//!   budget divided by the size of the entry just written.
//!
//! Subscriptions tail every stream from `$` with `XREAD BLOCK` on a background
//! thread and forward envelopes into an mpsc-backed [`Subscription`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use chrono::Utc;
use redis::Commands;
use redis::streams::{StreamReadOptions, StreamReadReply};
use serde_json::Value as JsonValue;
use tracing::{debug, error, instrument, warn};

use stockroom_events::{ChannelConfig, EventBus, EventEnvelope, Subscription};

/// How long one `XREAD` blocks before the subscriber loop checks for shutdown.
const READ_BLOCK_MS: usize = 1000;

/// Entries fetched per `XREAD`.
const READ_COUNT: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum RedisStreamsError {
    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Redis command error: {0}")]
    Command(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),
}

#[derive(Debug, Clone)]
pub struct RedisStreamsEventBus {
    client: Arc<redis::Client>,
    prefix: String,
    channels: HashMap<String, ChannelConfig>,
}

impl RedisStreamsEventBus {
    /// Create a bus for the given channels.
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `prefix` - stream key prefix (e.g., "stockroom")
    pub fn new(
        redis_url: impl AsRef<str>,
        prefix: impl Into<String>,
        channels: impl IntoIterator<Item = ChannelConfig>,
    ) -> Result<Self, RedisStreamsError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisStreamsError::Connection(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            prefix: prefix.into(),
            channels: channels
                .into_iter()
                .map(|c| (c.name().to_string(), c))
                .collect(),
        })
    }

    pub fn stream_key(&self, channel: &str, partition: u32) -> String {
        format!("{}:{}:{}", self.prefix, channel, partition)
    }

    /// Every stream key this bus writes to.
    pub fn stream_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .channels
            .values()
            .flat_map(|c| (0..c.partitions()).map(move |p| (c.name(), p)))
            .map(|(name, p)| self.stream_key(name, p))
            .collect();
        keys.sort();
        keys
    }

    #[instrument(
        skip(self, message),
        fields(channel = %message.channel(), key = %message.key(), seq = message.sequence_number()),
        err
    )]
    fn publish_sync(&self, message: EventEnvelope<JsonValue>) -> Result<(), RedisStreamsError> {
        let channel = self
            .channels
            .get(message.channel())
            .ok_or_else(|| RedisStreamsError::UnknownChannel(message.channel().to_string()))?;

        let payload = serde_json::to_string(&message)
            .map_err(|e| RedisStreamsError::Serialization(e.to_string()))?;

        let partition = channel.partition_for(message.key());
        let stream_key = self.stream_key(channel.name(), partition);
        let retention = channel.retention();

        let max_age_ms = i64::try_from(retention.max_age.as_millis()).unwrap_or(i64::MAX);
        let min_id = Utc::now().timestamp_millis().saturating_sub(max_age_ms).max(0);

        let partition_budget = retention.max_bytes / u64::from(channel.partitions());
        let max_len = (partition_budget / (payload.len() as u64).max(1)).max(1);

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| RedisStreamsError::Connection(e.to_string()))?;

        let (entry_id,): (String,) = redis::pipe()
            .atomic()
            .cmd("XADD")
            .arg(&stream_key)
            .arg("MINID")
            .arg("~")
            .arg(min_id)
            .arg("*")
            .arg("key")
            .arg(message.key())
            .arg("sequence_number")
            .arg(message.sequence_number())
            .arg("payload")
            .arg(&payload)
            .cmd("XTRIM")
            .arg(&stream_key)
            .arg("MAXLEN")
            .arg("~")
            .arg(max_len)
            .ignore()
            .query(&mut conn)
            .map_err(|e| RedisStreamsError::Command(format!("XADD failed: {}", e)))?;

        debug!(stream_key = %stream_key, entry_id = %entry_id, "event appended to stream");
        Ok(())
    }
}

impl EventBus<EventEnvelope<JsonValue>> for RedisStreamsEventBus {
    type Error = RedisStreamsError;

    fn publish(&self, message: EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
        self.publish_sync(message)
    }

    fn subscribe(&self) -> Subscription<EventEnvelope<JsonValue>> {
        let (tx, rx) = mpsc::channel();
        let client = self.client.clone();
        let keys = self.stream_keys();

        std::thread::spawn(move || tail_streams(client, keys, tx));

        Subscription::new(rx)
    }
}

/// Follow `keys` from their current end until the receiver is dropped.
fn tail_streams(
    client: Arc<redis::Client>,
    keys: Vec<String>,
    tx: mpsc::Sender<EventEnvelope<JsonValue>>,
) {
    let mut last_ids: Vec<String> = vec!["$".to_string(); keys.len()];
    let opts = StreamReadOptions::default()
        .block(READ_BLOCK_MS)
        .count(READ_COUNT);

    loop {
        let mut conn = match client.get_connection() {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "stream subscriber cannot connect; retrying");
                std::thread::sleep(Duration::from_secs(1));
                continue;
            }
        };

        loop {
            let reply: StreamReadReply = match conn.xread_options(&keys, &last_ids, &opts) {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "XREAD failed; reconnecting");
                    break;
                }
            };

            for stream in reply.keys {
                let Some(idx) = keys.iter().position(|k| *k == stream.key) else {
                    continue;
                };
                for entry in stream.ids {
                    last_ids[idx] = entry.id.clone();

                    let Some(raw) = entry.get::<String>("payload") else {
                        warn!(stream_key = %stream.key, entry_id = %entry.id, "entry without payload");
                        continue;
                    };
                    match serde_json::from_str::<EventEnvelope<JsonValue>>(&raw) {
                        Ok(envelope) => {
                            if tx.send(envelope).is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!(
                            stream_key = %stream.key,
                            entry_id = %entry.id,
                            error = %e,
                            "undecodable envelope skipped"
                        ),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use stockroom_events::RetentionPolicy;

    use super::*;

    fn bus() -> RedisStreamsEventBus {
        RedisStreamsEventBus::new(
            "redis://127.0.0.1:6379",
            "stockroom",
            [ChannelConfig::new("product.created", 3, RetentionPolicy::default())],
        )
        .unwrap()
    }

    #[test]
    fn one_stream_per_partition() {
        assert_eq!(
            bus().stream_keys(),
            vec![
                "stockroom:product.created:0",
                "stockroom:product.created:1",
                "stockroom:product.created:2",
            ]
        );
    }

    #[test]
    fn invalid_url_is_a_connection_error() {
        let err = RedisStreamsEventBus::new("not a url", "p", Vec::<ChannelConfig>::new()).unwrap_err();
        assert!(matches!(err, RedisStreamsError::Connection(_)));
    }
}
