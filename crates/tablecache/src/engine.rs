//! TableCache: read-through cache wrapping one table source

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sheetstore::TableSource;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::TableCacheConfig;
use crate::error::{Error, Result};
use crate::index::{group_key, primary_key, GroupIndex, IndexBuilder, PrimaryIndex, Row};
use crate::stats::CacheStats;
use crate::store::{CacheStore, CacheValue};

#[derive(Default)]
struct RefreshState {
    generation: u64,
    last_failure: Option<Arc<sheetstore::Error>>,
}

/// Read-through cache over one table
///
/// Every refresh fetches the whole table, rebuilds the primary index and
/// all registered secondary indices from the same rows, and writes them to
/// the store with one shared lifetime. At most one refresh runs at a time;
/// callers arriving meanwhile wait for it and reuse its outcome.
pub struct TableCache<T: Row> {
    table: String,
    primary_key: String,
    ttl: Duration,
    source: Arc<dyn TableSource<T>>,
    store: Arc<dyn CacheStore>,
    indexes: Vec<IndexBuilder<T>>,
    refresh: Mutex<RefreshState>,
    /// Completed refresh attempts, successful or not
    attempts: AtomicU64,
    stats: CacheStats,
}

impl<T: Row> TableCache<T> {
    /// Create an engine for `table`, using the lifetime `config` assigns to it
    pub fn new(
        table: impl Into<String>,
        source: Arc<dyn TableSource<T>>,
        store: Arc<dyn CacheStore>,
        config: &TableCacheConfig,
    ) -> Self {
        let table = table.into();
        Self {
            primary_key: primary_key(&table),
            ttl: config.ttl_for(&table),
            table,
            source,
            store,
            indexes: Vec::new(),
            refresh: Mutex::new(RefreshState::default()),
            attempts: AtomicU64::new(0),
            stats: CacheStats::new(),
        }
    }

    /// Override the lifetime of this table's refreshes
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Builder form of [`register_index`](Self::register_index)
    pub fn with_index<F>(mut self, name: &str, key_fn: F) -> Self
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        self.register_index(name, key_fn);
        self
    }

    /// Declare a secondary index rebuilt on every refresh
    ///
    /// Rows for which `key_fn` returns `None` are left out of the index.
    /// Registering a name twice replaces the earlier builder.
    pub fn register_index<F>(&mut self, name: &str, key_fn: F)
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        let builder = IndexBuilder {
            name: name.to_string(),
            cache_key: group_key(&self.table, name),
            key_fn: Box::new(key_fn),
        };
        match self.indexes.iter_mut().find(|b| b.name == name) {
            Some(existing) => *existing = builder,
            None => self.indexes.push(builder),
        }
    }

    /// Table name, also the namespace of its store keys
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Lifetime of a refresh
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Names of the registered secondary indices
    pub fn index_names(&self) -> impl Iterator<Item = &str> {
        self.indexes.iter().map(|b| b.name.as_str())
    }

    /// Lookup and refresh counters
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Every row of the table in fetch order
    pub async fn read_all(&self) -> Result<Vec<Arc<T>>> {
        let primary = self.primary().await?;
        Ok(primary.rows().to_vec())
    }

    /// Row with `id`
    pub async fn read_by_id(&self, id: &str) -> Result<Arc<T>> {
        let primary = self.primary().await?;
        primary.get(id).cloned().ok_or_else(|| Error::NotFound {
            table: self.table.clone(),
            id: id.to_string(),
        })
    }

    /// Rows whose ids are in `ids`, in the order requested; unknown ids are skipped
    pub async fn read_by_ids<I, S>(&self, ids: I) -> Result<Vec<Arc<T>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let primary = self.primary().await?;
        Ok(ids
            .into_iter()
            .filter_map(|id| primary.get(id.as_ref()).cloned())
            .collect())
    }

    /// Rows grouped under `key` by the secondary index `name`
    ///
    /// Never refreshes: fails with [`Error::IndexUnavailable`] when the index
    /// is not in the store. A key without rows yields an empty vector.
    pub async fn read_by_group_key(&self, name: &str, key: &str) -> Result<Vec<Arc<T>>> {
        let index = self.group_index(name)?;
        Ok(index.get(key).to_vec())
    }

    /// Like [`read_by_group_key`](Self::read_by_group_key), refreshing the
    /// table first when it is cold or expired
    ///
    /// If the primary index is warm but this index was evicted on its own, or
    /// was built by another refresh than the primary, the table is refreshed
    /// once more so both come from the same fetch.
    pub async fn read_by_group_key_warm(&self, name: &str, key: &str) -> Result<Vec<Arc<T>>> {
        self.builder(name)?;
        let primary = self.primary().await?;
        match self.group_index(name) {
            Ok(index) if index.generation() == primary.generation() => Ok(index.get(key).to_vec()),
            Ok(_) | Err(Error::IndexUnavailable { .. }) => {
                debug!(table = %self.table, index = name, "Secondary index missing or stale, rebuilding");
                self.refresh_after(primary.generation()).await?;
                Ok(self.group_index(name)?.get(key).to_vec())
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch the table now, even if the cache is warm
    pub async fn refresh(&self) -> Result<()> {
        let mut state = self.refresh.lock().await;
        self.refresh_locked(&mut state).await.map(|_| ())
    }

    /// Load the table if it is cold or expired
    pub async fn warm_up(&self) -> Result<()> {
        self.primary().await.map(|_| ())
    }

    /// Drop every store entry of this table
    pub fn invalidate(&self) {
        self.store.remove(&self.primary_key);
        for builder in &self.indexes {
            self.store.remove(&builder.cache_key);
        }
        debug!(table = %self.table, "Invalidated table");
    }

    fn builder(&self, name: &str) -> Result<&IndexBuilder<T>> {
        self.indexes
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| Error::UnknownIndex {
                table: self.table.clone(),
                index: name.to_string(),
            })
    }

    fn cached_primary(&self) -> Option<Arc<PrimaryIndex<T>>> {
        self.store
            .try_get(&self.primary_key)?
            .downcast::<PrimaryIndex<T>>()
            .ok()
    }

    fn group_index(&self, name: &str) -> Result<Arc<GroupIndex<T>>> {
        let builder = self.builder(name)?;
        self.store
            .try_get(&builder.cache_key)
            .and_then(|value| value.downcast::<GroupIndex<T>>().ok())
            .ok_or_else(|| Error::IndexUnavailable {
                table: self.table.clone(),
                index: name.to_string(),
            })
    }

    /// Current primary index, refreshing through the single-flight lock on a miss
    async fn primary(&self) -> Result<Arc<PrimaryIndex<T>>> {
        if let Some(primary) = self.cached_primary() {
            self.stats.record_hit();
            return Ok(primary);
        }
        self.stats.record_miss();
        debug!(table = %self.table, "Cache miss");

        let observed = self.attempts.load(Ordering::Acquire);
        let mut state = self.refresh.lock().await;

        if let Some(primary) = self.cached_primary() {
            self.stats.record_shared();
            return Ok(primary);
        }
        if self.attempts.load(Ordering::Acquire) != observed {
            if let Some(failure) = &state.last_failure {
                self.stats.record_shared();
                return Err(self.fetch_failed(Arc::clone(failure)));
            }
        }

        self.refresh_locked(&mut state).await
    }

    /// Refresh unless another caller already did since `generation` was observed
    async fn refresh_after(&self, generation: u64) -> Result<()> {
        let mut state = self.refresh.lock().await;
        if state.generation != generation {
            self.stats.record_shared();
            return Ok(());
        }
        self.refresh_locked(&mut state).await.map(|_| ())
    }

    async fn refresh_locked(&self, state: &mut RefreshState) -> Result<Arc<PrimaryIndex<T>>> {
        self.stats.record_fetch();
        let started = Instant::now();
        let fetched = self.source.fetch_all().await;

        let rows = match fetched {
            Ok(rows) => rows,
            Err(err) => {
                let err = Arc::new(err);
                self.stats.record_fetch_failure();
                warn!(table = %self.table, error = %err, "Table refresh failed");
                state.last_failure = Some(Arc::clone(&err));
                self.attempts.fetch_add(1, Ordering::AcqRel);
                return Err(self.fetch_failed(err));
            }
        };

        state.generation += 1;
        state.last_failure = None;
        let generation = state.generation;

        let rows: Vec<Arc<T>> = rows.into_iter().map(Arc::new).collect();
        let primary = Arc::new(PrimaryIndex::build(generation, rows));
        if primary.is_empty() {
            debug!(table = %self.table, "Source returned no rows");
        }

        let mut entries: Vec<(String, CacheValue)> = Vec::with_capacity(self.indexes.len() + 1);
        for builder in &self.indexes {
            let index = GroupIndex::build(generation, primary.rows(), &*builder.key_fn);
            debug!(table = %self.table, index = %builder.name, keys = index.key_count(), "Built index");
            entries.push((builder.cache_key.clone(), Arc::new(index) as CacheValue));
        }
        entries.push((self.primary_key.clone(), primary.clone() as CacheValue));
        self.store.set_many(entries, self.ttl);
        self.attempts.fetch_add(1, Ordering::AcqRel);

        info!(
            table = %self.table,
            rows = primary.len(),
            indexes = self.indexes.len(),
            generation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Refreshed table"
        );
        Ok(primary)
    }

    fn fetch_failed(&self, source: Arc<sheetstore::Error>) -> Error {
        Error::FetchFailed {
            table: self.table.clone(),
            source,
        }
    }
}
