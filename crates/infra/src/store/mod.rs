//! EntityStore boundary: durable keyed storage for product records.
//!
//! The trait makes no storage assumptions; the in-memory implementation backs
//! dev, tests and benchmarks.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryProductStore;
pub use r#trait::{ProductStore, StoreError};
