//! Infrastructure event bus implementations.
//!
//! The bus abstraction and the in-memory broker live in `stockroom-events` as
//! pure mechanics. This module adds infrastructure-backed implementations
//! (Redis Streams) and the runtime switch between them.

#[cfg(feature = "redis")]
pub mod redis_streams;

#[cfg(feature = "redis")]
pub use redis_streams::{RedisStreamsError, RedisStreamsEventBus};

use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;

use stockroom_events::{BrokerError, EventBus, EventEnvelope, InMemoryBroker, Subscription};

use crate::config::{AppConfig, EventBackend};

#[derive(Debug, Error)]
pub enum BusError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[cfg(feature = "redis")]
    #[error(transparent)]
    Redis(#[from] RedisStreamsError),

    #[error("event backend '{0}' is not compiled into this build")]
    BackendUnavailable(&'static str),
}

/// The bus selected by `EVENT_BACKEND`.
#[derive(Debug, Clone)]
pub enum ConfiguredEventBus {
    InMemory(Arc<InMemoryBroker>),
    #[cfg(feature = "redis")]
    RedisStreams(Arc<RedisStreamsEventBus>),
}

impl ConfiguredEventBus {
    pub fn from_config(config: &AppConfig) -> Result<Self, BusError> {
        match config.event_backend {
            EventBackend::Memory => Ok(Self::InMemory(Arc::new(InMemoryBroker::new(
                config.channel_configs(),
            )))),
            #[cfg(feature = "redis")]
            EventBackend::Redis => {
                let url = config.redis_url.as_deref().unwrap_or_default();
                let bus = RedisStreamsEventBus::new(
                    url,
                    config.redis_stream_prefix.clone(),
                    config.channel_configs(),
                )?;
                Ok(Self::RedisStreams(Arc::new(bus)))
            }
            #[cfg(not(feature = "redis"))]
            EventBackend::Redis => Err(BusError::BackendUnavailable("redis")),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "memory",
            #[cfg(feature = "redis")]
            Self::RedisStreams(_) => "redis",
        }
    }
}

impl EventBus<EventEnvelope<JsonValue>> for ConfiguredEventBus {
    type Error = BusError;

    fn publish(&self, message: EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
        match self {
            Self::InMemory(broker) => broker.publish(message).map_err(BusError::from),
            #[cfg(feature = "redis")]
            Self::RedisStreams(bus) => bus.publish(message).map_err(BusError::from),
        }
    }

    fn subscribe(&self) -> Subscription<EventEnvelope<JsonValue>> {
        match self {
            Self::InMemory(broker) => broker.subscribe(),
            #[cfg(feature = "redis")]
            Self::RedisStreams(bus) => bus.subscribe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_is_the_default() {
        let bus = ConfiguredEventBus::from_config(&AppConfig::default()).unwrap();
        assert_eq!(bus.backend_name(), "memory");
    }

    #[cfg(not(feature = "redis"))]
    #[test]
    fn redis_backend_needs_the_feature() {
        let config = AppConfig {
            event_backend: EventBackend::Redis,
            redis_url: Some("redis://127.0.0.1:6379".into()),
            ..AppConfig::default()
        };
        assert!(matches!(
            ConfiguredEventBus::from_config(&config),
            Err(BusError::BackendUnavailable("redis"))
        ));
    }
}
