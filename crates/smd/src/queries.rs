//! Questions the bot asks about students and teachers

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tablecache::Result;
use tracing::warn;

use crate::model::{StatementType, Student, Subject, Teacher};
use crate::tables::Tables;

/// A subject together with who lectures it and where its grades live
#[derive(Debug, Clone, Serialize)]
pub struct SubjectInfo {
    pub subject: Arc<Subject>,
    pub lecturer: Option<Arc<Teacher>>,
    pub lecture_statement: Option<String>,
}

pub struct Queries {
    tables: Arc<Tables>,
}

impl Queries {
    pub fn new(tables: Arc<Tables>) -> Self {
        Self { tables }
    }

    pub async fn student(&self, telegram_id: &str) -> Result<Arc<Student>> {
        self.tables.students.by_telegram_id(telegram_id).await
    }

    /// Subjects of the student's group
    pub async fn student_subjects(&self, telegram_id: &str) -> Result<Vec<Arc<Subject>>> {
        let student = self.student(telegram_id).await?;
        self.tables.subjects.by_group_id(&student.id_group).await
    }

    /// Subject card for a student
    ///
    /// A missing lecturer row leaves `lecturer` empty. Statements are
    /// best-effort: if they cannot be loaded the link is omitted.
    pub async fn subject_info(&self, telegram_id: &str, subject_id: &str) -> Result<SubjectInfo> {
        self.student(telegram_id).await?;
        let subject = self.tables.subjects.by_id(subject_id).await?;

        let lecturer = match self.tables.teachers.by_id(&subject.id_teacher).await {
            Ok(teacher) => Some(teacher),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        let lecture_statement = match self.tables.statements.by_subject_id(subject_id).await {
            Ok(statements) => statements
                .iter()
                .find(|s| s.statement_type == StatementType::Lecture)
                .map(|s| s.url()),
            Err(e) => {
                warn!(subject = subject_id, error = %e, "Statements unavailable");
                None
            }
        };

        Ok(SubjectInfo {
            subject,
            lecturer,
            lecture_statement,
        })
    }

    /// Subjects the teacher lectures, then those where they lead a practice subgroup
    pub async fn teacher_subjects(&self, telegram_id: &str) -> Result<Vec<Arc<Subject>>> {
        let teacher = self.tables.teachers.by_telegram_id(telegram_id).await?;
        let lectured = self.tables.subjects.by_teacher_id(&teacher.id).await?;
        let subgroups = self.tables.subgroups.by_teacher_id(&teacher.id).await?;

        let mut seen = HashSet::new();
        let ids: Vec<&str> = lectured
            .iter()
            .map(|s| s.id.as_str())
            .chain(subgroups.iter().map(|g| g.id_subject.as_str()))
            .filter(|id| seen.insert(*id))
            .collect();

        self.tables.subjects.by_ids(ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata;
    use tablecache::{CacheStore, MemoryStore, TableCacheConfig};

    fn queries(dir: &std::path::Path) -> Queries {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new(64));
        let tables = Tables::open(dir, store, &TableCacheConfig::default());
        Queries::new(Arc::new(tables))
    }

    fn ids(subjects: &[Arc<Subject>]) -> Vec<&str> {
        subjects.iter().map(|s| s.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_student_subjects() {
        let dir = testdata::data_dir();
        let queries = queries(dir.path());

        let subjects = queries.student_subjects("1001").await.unwrap();
        assert_eq!(ids(&subjects), vec!["s1", "s2"]);

        // group without subjects
        assert!(queries.student_subjects("1004").await.unwrap().is_empty());
        assert!(queries
            .student_subjects("42")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_subject_info() {
        let dir = testdata::data_dir();
        let queries = queries(dir.path());

        let info = queries.subject_info("1001", "s1").await.unwrap();
        assert_eq!(info.subject.title, "Algebra");
        assert_eq!(info.lecturer.as_ref().unwrap().id, "t1");
        assert_eq!(
            info.lecture_statement.as_deref(),
            Some("https://docs.google.com/spreadsheets/d/1aBcD/edit#gid=0")
        );

        let info = queries.subject_info("1001", "s2").await.unwrap();
        assert!(info.lecture_statement.is_none());
    }

    #[tokio::test]
    async fn test_subject_info_missing_lecturer() {
        let dir = testdata::data_dir();
        let queries = queries(dir.path());

        let info = queries.subject_info("1003", "s4").await.unwrap();
        assert!(info.lecturer.is_none());
    }

    #[tokio::test]
    async fn test_subject_info_requires_student() {
        let dir = testdata::data_dir();
        let queries = queries(dir.path());

        let err = queries.subject_info("2001", "s1").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(queries
            .subject_info("1001", "s9")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_subject_info_without_statements() {
        let dir = testdata::data_dir();
        std::fs::remove_file(dir.path().join("statements.toon")).unwrap();
        let queries = queries(dir.path());

        let info = queries.subject_info("1001", "s1").await.unwrap();
        assert!(info.lecture_statement.is_none());
    }

    #[tokio::test]
    async fn test_teacher_subjects_deduplicated() {
        let dir = testdata::data_dir();
        let queries = queries(dir.path());

        // t1 lectures s1 and s3 and also leads a practice subgroup of s1
        let subjects = queries.teacher_subjects("2001").await.unwrap();
        assert_eq!(ids(&subjects), vec!["s1", "s3"]);

        // t2 lectures s2 and leads subgroups of s1 and s3
        let subjects = queries.teacher_subjects("2002").await.unwrap();
        assert_eq!(ids(&subjects), vec!["s2", "s1", "s3"]);

        assert!(queries.teacher_subjects("2003").await.unwrap().is_empty());
    }
}
