//! Event mechanics: envelopes, pub/sub, partitioned channels with retention.

pub mod broker;
pub mod bus;
pub mod channel;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod log;

pub use broker::{BrokerError, ChannelStats, InMemoryBroker};
pub use bus::{EventBus, Subscription};
pub use channel::{ChannelConfig, RetentionPolicy, partition_for};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use log::{LogRecord, PartitionedLog};
