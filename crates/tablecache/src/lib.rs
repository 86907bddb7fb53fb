//! # tablecache
//!
//! Read-through cache for slow, whole-table sources.
//!
//! ## Architecture
//! - **TableCache**: one engine per table; lazy refresh on cold or expired
//!   reads, at most one fetch in flight per table
//! - **Indices**: an id index plus named secondary groupings, all rebuilt
//!   from the same fetch and written with one shared lifetime
//! - **CacheStore**: injected TTL key/value store; [`MemoryStore`] keeps
//!   entries in an LRU map bounded by capacity
//!
//! ```ignore
//! let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new(1024));
//! let subjects = TableCache::new("subjects", source, store, &config)
//!     .with_index("ByGroupId", |s: &Subject| Some(s.id_group.clone()));
//!
//! let of_group = subjects.read_by_group_key_warm("ByGroupId", "g1").await?;
//! ```

#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod index;
mod lru;
mod stats;
mod store;

pub use config::TableCacheConfig;
pub use engine::TableCache;
pub use error::{Error, Result};
pub use index::{group_key, primary_key, GroupIndex, KeyFn, PrimaryIndex, Row};
pub use stats::{CacheStats, StoreStats};
pub use store::{CacheStore, CacheValue, MemoryStore};
