//! Process configuration, read from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use stockroom_events::{ChannelConfig, RetentionPolicy};
use stockroom_products::CHANNELS;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Where product events go.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventBackend {
    /// In-process broker; events live as long as the process.
    Memory,
    /// Redis Streams, one stream per channel partition.
    Redis,
}

impl FromStr for EventBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("expected 'memory' or 'redis', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub low_stock_threshold: u32,
    pub max_write_attempts: u32,
    pub event_partitions: u32,
    pub event_retention: RetentionPolicy,
    pub event_backend: EventBackend,
    pub redis_url: Option<String>,
    pub redis_stream_prefix: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            default_page_size: 20,
            max_page_size: 100,
            low_stock_threshold: 10,
            max_write_attempts: 3,
            event_partitions: 3,
            event_retention: RetentionPolicy::default(),
            event_backend: EventBackend::Memory,
            redis_url: None,
            redis_stream_prefix: "stockroom".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let retention_hours: u64 = parse(&lookup, "EVENT_RETENTION_HOURS", 24)?;
        let retention_bytes: u64 = parse(
            &lookup,
            "EVENT_RETENTION_BYTES",
            defaults.event_retention.max_bytes,
        )?;

        let config = Self {
            bind_addr: parse(&lookup, "BIND_ADDR", defaults.bind_addr)?,
            default_page_size: parse(&lookup, "DEFAULT_PAGE_SIZE", defaults.default_page_size)?,
            max_page_size: parse(&lookup, "MAX_PAGE_SIZE", defaults.max_page_size)?,
            low_stock_threshold: parse(
                &lookup,
                "LOW_STOCK_THRESHOLD",
                defaults.low_stock_threshold,
            )?,
            max_write_attempts: parse(&lookup, "MAX_WRITE_ATTEMPTS", defaults.max_write_attempts)?,
            event_partitions: parse(&lookup, "EVENT_PARTITIONS", defaults.event_partitions)?,
            event_retention: RetentionPolicy::new(
                Duration::from_secs(retention_hours.saturating_mul(3600)),
                retention_bytes,
            ),
            event_backend: parse(&lookup, "EVENT_BACKEND", defaults.event_backend)?,
            redis_url: lookup("REDIS_URL").filter(|v| !v.trim().is_empty()),
            redis_stream_prefix: lookup("REDIS_STREAM_PREFIX")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.redis_stream_prefix),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let at_least_one = |key: &'static str, value: u32| {
            if value == 0 {
                Err(ConfigError::Invalid {
                    key,
                    value: value.to_string(),
                    reason: "must be at least 1".to_string(),
                })
            } else {
                Ok(())
            }
        };
        at_least_one("MAX_PAGE_SIZE", self.max_page_size)?;
        at_least_one("DEFAULT_PAGE_SIZE", self.default_page_size)?;
        at_least_one("MAX_WRITE_ATTEMPTS", self.max_write_attempts)?;
        at_least_one("EVENT_PARTITIONS", self.event_partitions)?;

        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_PAGE_SIZE",
                value: self.default_page_size.to_string(),
                reason: format!("must not exceed MAX_PAGE_SIZE ({})", self.max_page_size),
            });
        }
        if self.event_backend == EventBackend::Redis && self.redis_url.is_none() {
            return Err(ConfigError::Missing("REDIS_URL"));
        }
        Ok(())
    }

    /// Channel definitions for the three product lifecycle channels.
    pub fn channel_configs(&self) -> Vec<ChannelConfig> {
        CHANNELS
            .iter()
            .map(|name| ChannelConfig::new(*name, self.event_partitions, self.event_retention))
            .collect()
    }
}

fn parse<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(from_pairs(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = from_pairs(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("LOW_STOCK_THRESHOLD", "3"),
            ("EVENT_RETENTION_HOURS", "1"),
            ("EVENT_BACKEND", "Memory"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.low_stock_threshold, 3);
        assert_eq!(config.event_retention.max_age, Duration::from_secs(3600));
    }

    #[test]
    fn garbage_values_are_rejected_with_key() {
        let err = from_pairs(&[("MAX_PAGE_SIZE", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "MAX_PAGE_SIZE", .. }));

        let err = from_pairs(&[("EVENT_BACKEND", "kafka")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "EVENT_BACKEND", .. }));
    }

    #[test]
    fn inconsistent_values_are_rejected() {
        assert!(from_pairs(&[("DEFAULT_PAGE_SIZE", "200")]).is_err());
        assert!(from_pairs(&[("MAX_WRITE_ATTEMPTS", "0")]).is_err());
        assert_eq!(
            from_pairs(&[("EVENT_BACKEND", "redis")]).unwrap_err(),
            ConfigError::Missing("REDIS_URL")
        );
    }

    #[test]
    fn channel_configs_cover_lifecycle_channels() {
        let names: Vec<String> = AppConfig::default()
            .channel_configs()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["product.created", "product.updated", "product.deleted"]);
    }
}
