//! Cached views over the academic tables

use std::path::Path;
use std::sync::Arc;

use sheetstore::{SheetFile, TableSource};
use tablecache::{CacheStats, CacheStore, Error, Result, TableCache, TableCacheConfig};
use tracing::{info, warn};

use crate::model::{Group, Statement, Student, Subgroup, Subject, Teacher};

const BY_TELEGRAM_ID: &str = "ByTelegramId";
const BY_GROUP_ID: &str = "ByGroupId";
const BY_TEACHER_ID: &str = "ByTeacherId";
const BY_SUBJECT_ID: &str = "BySubjectId";

/// First row of a "by telegram id" group, or `NotFound`
fn single<T>(table: &str, telegram_id: &str, rows: Vec<Arc<T>>) -> Result<Arc<T>> {
    rows.into_iter().next().ok_or_else(|| Error::NotFound {
        table: table.to_string(),
        id: telegram_id.to_string(),
    })
}

pub struct StudentsTable {
    cache: TableCache<Student>,
}

impl StudentsTable {
    pub const NAME: &'static str = "students";

    pub fn new(
        source: Arc<dyn TableSource<Student>>,
        store: Arc<dyn CacheStore>,
        config: &TableCacheConfig,
    ) -> Self {
        let cache = TableCache::new(Self::NAME, source, store, config)
            .with_index(BY_TELEGRAM_ID, |s: &Student| Some(s.telegram_id.clone()));
        Self { cache }
    }

    pub async fn by_id(&self, id: &str) -> Result<Arc<Student>> {
        self.cache.read_by_id(id).await
    }

    pub async fn by_telegram_id(&self, telegram_id: &str) -> Result<Arc<Student>> {
        let rows = self
            .cache
            .read_by_group_key_warm(BY_TELEGRAM_ID, telegram_id)
            .await?;
        single(Self::NAME, telegram_id, rows)
    }

    pub fn cache(&self) -> &TableCache<Student> {
        &self.cache
    }
}

pub struct TeachersTable {
    cache: TableCache<Teacher>,
}

impl TeachersTable {
    pub const NAME: &'static str = "teachers";

    pub fn new(
        source: Arc<dyn TableSource<Teacher>>,
        store: Arc<dyn CacheStore>,
        config: &TableCacheConfig,
    ) -> Self {
        let cache = TableCache::new(Self::NAME, source, store, config)
            .with_index(BY_TELEGRAM_ID, |t: &Teacher| Some(t.telegram_id.clone()));
        Self { cache }
    }

    pub async fn by_id(&self, id: &str) -> Result<Arc<Teacher>> {
        self.cache.read_by_id(id).await
    }

    pub async fn by_telegram_id(&self, telegram_id: &str) -> Result<Arc<Teacher>> {
        let rows = self
            .cache
            .read_by_group_key_warm(BY_TELEGRAM_ID, telegram_id)
            .await?;
        single(Self::NAME, telegram_id, rows)
    }

    pub fn cache(&self) -> &TableCache<Teacher> {
        &self.cache
    }
}

/// Subjects change during the term, so their lifetime is configured shorter
pub struct SubjectsTable {
    cache: TableCache<Subject>,
}

impl SubjectsTable {
    pub const NAME: &'static str = "subjects";

    pub fn new(
        source: Arc<dyn TableSource<Subject>>,
        store: Arc<dyn CacheStore>,
        config: &TableCacheConfig,
    ) -> Self {
        let cache = TableCache::new(Self::NAME, source, store, config)
            .with_index(BY_GROUP_ID, |s: &Subject| Some(s.id_group.clone()))
            .with_index(BY_TEACHER_ID, |s: &Subject| Some(s.id_teacher.clone()));
        Self { cache }
    }

    pub async fn by_id(&self, id: &str) -> Result<Arc<Subject>> {
        self.cache.read_by_id(id).await
    }

    /// Subjects with the given ids, in request order; unknown ids are skipped
    pub async fn by_ids<I, S>(&self, ids: I) -> Result<Vec<Arc<Subject>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cache.read_by_ids(ids).await
    }

    pub async fn by_group_id(&self, group_id: &str) -> Result<Vec<Arc<Subject>>> {
        self.cache.read_by_group_key_warm(BY_GROUP_ID, group_id).await
    }

    /// Subjects lectured by the teacher
    pub async fn by_teacher_id(&self, teacher_id: &str) -> Result<Vec<Arc<Subject>>> {
        self.cache
            .read_by_group_key_warm(BY_TEACHER_ID, teacher_id)
            .await
    }

    pub fn cache(&self) -> &TableCache<Subject> {
        &self.cache
    }
}

pub struct SubgroupsTable {
    cache: TableCache<Subgroup>,
}

impl SubgroupsTable {
    pub const NAME: &'static str = "subgroups";

    pub fn new(
        source: Arc<dyn TableSource<Subgroup>>,
        store: Arc<dyn CacheStore>,
        config: &TableCacheConfig,
    ) -> Self {
        let cache = TableCache::new(Self::NAME, source, store, config)
            .with_index(BY_TEACHER_ID, |s: &Subgroup| Some(s.id_teacher.clone()));
        Self { cache }
    }

    pub async fn by_id(&self, id: &str) -> Result<Arc<Subgroup>> {
        self.cache.read_by_id(id).await
    }

    /// Practice subgroups led by the teacher
    pub async fn by_teacher_id(&self, teacher_id: &str) -> Result<Vec<Arc<Subgroup>>> {
        self.cache
            .read_by_group_key_warm(BY_TEACHER_ID, teacher_id)
            .await
    }

    pub fn cache(&self) -> &TableCache<Subgroup> {
        &self.cache
    }
}

pub struct StatementsTable {
    cache: TableCache<Statement>,
}

impl StatementsTable {
    pub const NAME: &'static str = "statements";

    pub fn new(
        source: Arc<dyn TableSource<Statement>>,
        store: Arc<dyn CacheStore>,
        config: &TableCacheConfig,
    ) -> Self {
        let cache = TableCache::new(Self::NAME, source, store, config)
            .with_index(BY_SUBJECT_ID, |s: &Statement| Some(s.id_subject.clone()));
        Self { cache }
    }

    pub async fn by_subject_id(&self, subject_id: &str) -> Result<Vec<Arc<Statement>>> {
        self.cache
            .read_by_group_key_warm(BY_SUBJECT_ID, subject_id)
            .await
    }

    pub fn cache(&self) -> &TableCache<Statement> {
        &self.cache
    }
}

pub struct GroupsTable {
    cache: TableCache<Group>,
}

impl GroupsTable {
    pub const NAME: &'static str = "groups";

    pub fn new(
        source: Arc<dyn TableSource<Group>>,
        store: Arc<dyn CacheStore>,
        config: &TableCacheConfig,
    ) -> Self {
        Self {
            cache: TableCache::new(Self::NAME, source, store, config),
        }
    }

    pub async fn by_id(&self, id: &str) -> Result<Arc<Group>> {
        self.cache.read_by_id(id).await
    }

    pub async fn all(&self) -> Result<Vec<Arc<Group>>> {
        self.cache.read_all().await
    }

    pub fn cache(&self) -> &TableCache<Group> {
        &self.cache
    }
}

/// Every table the daemon serves, sharing one store
pub struct Tables {
    pub students: StudentsTable,
    pub teachers: TeachersTable,
    pub subjects: SubjectsTable,
    pub subgroups: SubgroupsTable,
    pub statements: StatementsTable,
    pub groups: GroupsTable,
}

impl Tables {
    /// Store entries written when every table is warm: one primary index per
    /// table plus its secondary indices
    pub const STORE_ENTRIES: usize = 2 + 2 + 3 + 2 + 2 + 1;

    /// Back every table with `<data_dir>/<table>.toon`
    pub fn open(data_dir: &Path, store: Arc<dyn CacheStore>, config: &TableCacheConfig) -> Self {
        Self {
            students: StudentsTable::new(
                Arc::new(SheetFile::new(data_dir, StudentsTable::NAME)),
                Arc::clone(&store),
                config,
            ),
            teachers: TeachersTable::new(
                Arc::new(SheetFile::new(data_dir, TeachersTable::NAME)),
                Arc::clone(&store),
                config,
            ),
            subjects: SubjectsTable::new(
                Arc::new(SheetFile::new(data_dir, SubjectsTable::NAME)),
                Arc::clone(&store),
                config,
            ),
            subgroups: SubgroupsTable::new(
                Arc::new(SheetFile::new(data_dir, SubgroupsTable::NAME)),
                Arc::clone(&store),
                config,
            ),
            statements: StatementsTable::new(
                Arc::new(SheetFile::new(data_dir, StatementsTable::NAME)),
                Arc::clone(&store),
                config,
            ),
            groups: GroupsTable::new(
                Arc::new(SheetFile::new(data_dir, GroupsTable::NAME)),
                store,
                config,
            ),
        }
    }

    /// Store entries the registered indices need, counted from the engines
    pub fn store_entries(&self) -> usize {
        [
            self.students.cache().index_names().count(),
            self.teachers.cache().index_names().count(),
            self.subjects.cache().index_names().count(),
            self.subgroups.cache().index_names().count(),
            self.statements.cache().index_names().count(),
            self.groups.cache().index_names().count(),
        ]
        .iter()
        .map(|indexes| 1 + indexes)
        .sum()
    }

    /// Lookup counters per table, in a fixed order
    pub fn stats(&self) -> [(&'static str, &CacheStats); 6] {
        [
            (StudentsTable::NAME, self.students.cache().stats()),
            (TeachersTable::NAME, self.teachers.cache().stats()),
            (SubjectsTable::NAME, self.subjects.cache().stats()),
            (SubgroupsTable::NAME, self.subgroups.cache().stats()),
            (StatementsTable::NAME, self.statements.cache().stats()),
            (GroupsTable::NAME, self.groups.cache().stats()),
        ]
    }

    /// Load every table, returning how many failed
    ///
    /// A failed table stays cold and is retried by the first read that needs it.
    pub async fn warm_up(&self) -> usize {
        let results = [
            (StudentsTable::NAME, self.students.cache().warm_up().await),
            (TeachersTable::NAME, self.teachers.cache().warm_up().await),
            (SubjectsTable::NAME, self.subjects.cache().warm_up().await),
            (SubgroupsTable::NAME, self.subgroups.cache().warm_up().await),
            (StatementsTable::NAME, self.statements.cache().warm_up().await),
            (GroupsTable::NAME, self.groups.cache().warm_up().await),
        ];

        let mut failed = 0;
        for (table, result) in results {
            match result {
                Ok(()) => info!(table, "Table warmed up"),
                Err(e) => {
                    warn!(table, error = %e, "Could not warm up table");
                    failed += 1;
                }
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata;
    use tablecache::MemoryStore;

    fn open(dir: &Path) -> Tables {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new(64));
        Tables::open(dir, store, &TableCacheConfig::default())
    }

    #[tokio::test]
    async fn test_students_by_telegram_id() {
        let dir = testdata::data_dir();
        let tables = open(dir.path());

        let student = tables.students.by_telegram_id("1002").await.unwrap();
        assert_eq!(student.id, "st2");
        assert_eq!(student.patronymic, None);

        let err = tables.students.by_telegram_id("9999").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_subjects_indices() {
        let dir = testdata::data_dir();
        let tables = open(dir.path());

        let ids: Vec<_> = tables
            .subjects
            .by_group_id("g1")
            .await
            .unwrap()
            .iter()
            .map(|s| s.id.clone())
            .collect();
        assert_eq!(ids, vec!["s1", "s2"]);

        let lectured = tables.subjects.by_teacher_id("t1").await.unwrap();
        assert_eq!(lectured.len(), 2);
        assert!(tables.subjects.by_group_id("g9").await.unwrap().is_empty());

        let picked = tables.subjects.by_ids(["s3", "s0", "s1"]).await.unwrap();
        let ids: Vec<_> = picked.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s3", "s1"]);

        // one fetch served every lookup above
        assert_eq!(tables.subjects.cache().stats().fetches(), 1);
    }

    #[tokio::test]
    async fn test_groups_all() {
        let dir = testdata::data_dir();
        let tables = open(dir.path());

        let groups = tables.groups.all().await.unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(tables.groups.by_id("g2").await.unwrap().title, "M3302");
    }

    #[tokio::test]
    async fn test_missing_sheet_is_transient() {
        let dir = tempfile::TempDir::new().unwrap();
        let tables = open(dir.path());

        let err = tables.teachers.by_id("t1").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_warm_up_counts_failures() {
        let dir = testdata::data_dir();
        std::fs::remove_file(dir.path().join("groups.toon")).unwrap();
        let tables = open(dir.path());

        assert_eq!(tables.warm_up().await, 1);
        assert_eq!(tables.students.cache().stats().fetches(), 1);
        assert_eq!(tables.groups.cache().stats().fetch_failures(), 1);
    }

    #[test]
    fn test_store_entries_match_registered_indices() {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new(8));
        let tables = Tables::open(Path::new("unused"), store, &TableCacheConfig::default());

        assert_eq!(tables.store_entries(), Tables::STORE_ENTRIES);
    }

    #[tokio::test]
    async fn test_minimum_capacity_keeps_every_table_warm() {
        let dir = testdata::data_dir();
        let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new(Tables::STORE_ENTRIES));
        let tables = Tables::open(dir.path(), store, &TableCacheConfig::default());
        assert_eq!(tables.warm_up().await, 0);

        for _ in 0..5 {
            tables.subjects.by_group_id("g1").await.unwrap();
            tables.students.by_telegram_id("1001").await.unwrap();
            tables.statements.by_subject_id("s1").await.unwrap();
        }
        for (table, stats) in tables.stats() {
            assert_eq!(stats.fetches(), 1, "{} was fetched again", table);
        }
    }

    #[test]
    fn test_subjects_ttl_override() {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new(8));
        let config = TableCacheConfig::default()
            .with_override(SubjectsTable::NAME, std::time::Duration::from_secs(360));
        let tables = Tables::open(Path::new("unused"), store, &config);

        assert_eq!(tables.subjects.cache().ttl().as_secs(), 360);
        assert_eq!(tables.students.cache().ttl().as_secs(), 1800);
    }
}
