//! Primary and secondary indices built from one fetched table

use std::collections::HashMap;
use std::sync::Arc;

use ahash::RandomState;

/// A table row with a string identifier, unique within its table
pub trait Row: Send + Sync + 'static {
    /// Stable identifier of the row
    fn id(&self) -> &str;
}

/// Maps a row to the grouping key of a secondary index
pub type KeyFn<T> = dyn Fn(&T) -> Option<String> + Send + Sync;

/// Store key of a table's primary index
pub fn primary_key(table: &str) -> String {
    format!("{}-ById", table)
}

/// Store key of a table's secondary index
pub fn group_key(table: &str, index: &str) -> String {
    format!("{}-{}", table, index)
}

/// Rows of one refresh in fetch order, addressable by id
///
/// Duplicate ids resolve to the last row carrying them.
pub struct PrimaryIndex<T> {
    generation: u64,
    rows: Vec<Arc<T>>,
    by_id: HashMap<String, Arc<T>, RandomState>,
}

impl<T: Row> PrimaryIndex<T> {
    pub(crate) fn build(generation: u64, rows: Vec<Arc<T>>) -> Self {
        let mut by_id = HashMap::with_capacity_and_hasher(rows.len(), RandomState::new());
        for row in &rows {
            by_id.insert(row.id().to_string(), Arc::clone(row));
        }
        Self {
            generation,
            rows,
            by_id,
        }
    }

    /// Refresh this index was built in
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Every fetched row, in fetch order
    pub fn rows(&self) -> &[Arc<T>] {
        &self.rows
    }

    /// Row with `id`
    pub fn get(&self, id: &str) -> Option<&Arc<T>> {
        self.by_id.get(id)
    }

    /// Number of fetched rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the fetch returned no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Rows of one refresh grouped by a derived key, fetch order kept per key
pub struct GroupIndex<T> {
    generation: u64,
    groups: HashMap<String, Vec<Arc<T>>, RandomState>,
}

impl<T: Row> GroupIndex<T> {
    pub(crate) fn build(generation: u64, rows: &[Arc<T>], key_fn: &KeyFn<T>) -> Self {
        let mut groups: HashMap<String, Vec<Arc<T>>, RandomState> = HashMap::default();
        for row in rows {
            if let Some(key) = key_fn(row.as_ref()) {
                groups.entry(key).or_default().push(Arc::clone(row));
            }
        }
        Self { generation, groups }
    }

    /// Refresh this index was built in
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Rows grouped under `key`; empty when the key has no rows
    pub fn get(&self, key: &str) -> &[Arc<T>] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.groups.len()
    }
}

pub(crate) struct IndexBuilder<T> {
    pub(crate) name: String,
    pub(crate) cache_key: String,
    pub(crate) key_fn: Box<KeyFn<T>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Subject {
        id: &'static str,
        group: Option<&'static str>,
    }

    impl Row for Subject {
        fn id(&self) -> &str {
            self.id
        }
    }

    fn rows(data: &[(&'static str, Option<&'static str>)]) -> Vec<Arc<Subject>> {
        data.iter()
            .map(|&(id, group)| Arc::new(Subject { id, group }))
            .collect()
    }

    #[test]
    fn test_keys() {
        assert_eq!(primary_key("subjects"), "subjects-ById");
        assert_eq!(group_key("subjects", "ByGroupId"), "subjects-ByGroupId");
    }

    #[test]
    fn test_primary_last_write_wins() {
        let index = PrimaryIndex::build(
            1,
            rows(&[("s1", Some("g1")), ("s2", None), ("s1", Some("g2"))]),
        );

        assert_eq!(index.len(), 3);
        assert_eq!(index.get("s1").unwrap().group, Some("g2"));
        assert!(index.get("s9").is_none());
    }

    #[test]
    fn test_group_index_keeps_fetch_order() {
        let rows = rows(&[
            ("s1", Some("g1")),
            ("s2", None),
            ("s3", Some("g2")),
            ("s4", Some("g1")),
        ]);
        let key_fn: Box<KeyFn<Subject>> = Box::new(|s: &Subject| s.group.map(str::to_string));
        let index = GroupIndex::build(7, &rows, &*key_fn);

        let ids: Vec<_> = index.get("g1").iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["s1", "s4"]);
        assert!(index.get("g3").is_empty());
        assert_eq!(index.key_count(), 2);
        assert_eq!(index.generation(), 7);
    }
}
