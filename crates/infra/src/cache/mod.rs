//! ReadCache: keyed caches in front of the store.
//!
//! Caches never talk to the store. Keeping them coherent is the caller's job
//! (see `InventoryService`), which evicts or overwrites entries on every
//! mutating path.

mod keyed;
mod read_cache;

pub use keyed::{CacheStats, InMemoryCache, KeyedCache};
pub use read_cache::ReadCache;
