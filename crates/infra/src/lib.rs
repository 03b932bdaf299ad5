//! Infrastructure layer: storage, caching, event publication, config.

pub mod cache;
pub mod config;
pub mod event_bus;
pub mod publisher;
pub mod service;
pub mod store;

mod integration_tests;

pub use config::{AppConfig, ConfigError, EventBackend};
pub use service::{InventoryService, ServiceSettings, ServiceStats};
