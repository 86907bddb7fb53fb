//! Cache lifetimes and store sizing

use std::collections::HashMap;
use std::time::Duration;

/// Configuration shared by every table engine and the in-memory store
#[derive(Debug, Clone, PartialEq)]
pub struct TableCacheConfig {
    /// Lifetime of a refresh when the table has no override
    pub default_ttl: Duration,
    /// Per-table lifetimes, keyed by table name
    pub ttl_overrides: HashMap<String, Duration>,
    /// Maximum number of entries held by [`MemoryStore`](crate::MemoryStore)
    pub capacity: usize,
}

impl TableCacheConfig {
    /// Default lifetime of cached tables (30 minutes)
    pub const DEFAULT_TTL_SECS: u64 = 30 * 60;
    /// Default store capacity in entries
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Lifetime to use for `table`
    pub fn ttl_for(&self, table: &str) -> Duration {
        self.ttl_overrides
            .get(table)
            .copied()
            .unwrap_or(self.default_ttl)
    }

    /// Set a lifetime override for `table`
    pub fn with_override(mut self, table: impl Into<String>, ttl: Duration) -> Self {
        self.ttl_overrides.insert(table.into(), ttl);
        self
    }
}

impl Default for TableCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(Self::DEFAULT_TTL_SECS),
            ttl_overrides: HashMap::new(),
            capacity: Self::DEFAULT_CAPACITY,
        }
    }
}
