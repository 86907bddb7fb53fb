//! Daemon settings: optional JSON file, then command-line overrides

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tablecache::TableCacheConfig;

use crate::tables::{SubjectsTable, Tables};

/// Lifetime of the subjects table unless configured otherwise (6 minutes)
pub const SUBJECTS_TTL_SECS: u64 = 6 * 60;

/// Contents of the settings file
///
/// ```json
/// { "default_ttl_secs": 1800, "ttl_overrides_secs": { "subjects": 360 }, "capacity": 1024 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub default_ttl_secs: u64,
    pub ttl_overrides_secs: HashMap<String, u64>,
    pub capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let mut ttl_overrides_secs = HashMap::new();
        ttl_overrides_secs.insert(SubjectsTable::NAME.to_string(), SUBJECTS_TTL_SECS);
        Self {
            default_ttl_secs: TableCacheConfig::DEFAULT_TTL_SECS,
            ttl_overrides_secs,
            capacity: TableCacheConfig::DEFAULT_CAPACITY,
        }
    }
}

impl Settings {
    /// Read settings from `path`, or use the defaults when no file is given
    ///
    /// Keys missing from the file keep their defaults; an `ttl_overrides_secs`
    /// map in the file replaces the default overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing settings in {}", path.display()))
    }

    /// Apply command-line values on top of the file
    pub fn override_with(
        mut self,
        capacity: Option<usize>,
        ttl_secs: Option<u64>,
        subjects_ttl_secs: Option<u64>,
    ) -> Self {
        if let Some(capacity) = capacity {
            self.capacity = capacity;
        }
        if let Some(ttl) = ttl_secs {
            self.default_ttl_secs = ttl;
        }
        if let Some(ttl) = subjects_ttl_secs {
            self.ttl_overrides_secs
                .insert(SubjectsTable::NAME.to_string(), ttl);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity < Tables::STORE_ENTRIES {
            anyhow::bail!(
                "capacity {} cannot hold the {} index entries of all tables",
                self.capacity,
                Tables::STORE_ENTRIES
            );
        }
        if self.default_ttl_secs == 0 {
            anyhow::bail!("default_ttl_secs must be at least 1");
        }
        if let Some((table, _)) = self.ttl_overrides_secs.iter().find(|(_, ttl)| **ttl == 0) {
            anyhow::bail!("ttl override for `{}` must be at least 1", table);
        }
        Ok(())
    }

    pub fn cache_config(&self) -> TableCacheConfig {
        TableCacheConfig {
            default_ttl: Duration::from_secs(self.default_ttl_secs),
            ttl_overrides: self
                .ttl_overrides_secs
                .iter()
                .map(|(table, secs)| (table.clone(), Duration::from_secs(*secs)))
                .collect(),
            capacity: self.capacity,
        }
    }
}
