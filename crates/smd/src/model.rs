//! Rows of the academic sheets

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use sheetstore::{FromRecord, Record, Result};
use tablecache::Row;

/// A student, linked to a study group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Student {
    pub id: String,
    pub telegram_id: String,
    pub isu_id: String,
    pub id_group: String,
    pub first_name: String,
    pub last_name: String,
    pub patronymic: Option<String>,
}

/// A lecturer or practice teacher
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Teacher {
    pub id: String,
    pub telegram_id: String,
    pub first_name: String,
    pub last_name: String,
    pub patronymic: Option<String>,
}

/// A subject taught to one group by one lecturer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
    pub id: String,
    pub title: String,
    pub term: u8,
    pub id_group: String,
    pub id_teacher: String,
    pub link_to_csc: Option<String>,
}

/// Practice subgroup of a subject, led by a teacher
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subgroup {
    pub id: String,
    pub id_subject: String,
    pub id_teacher: String,
    pub title: Option<String>,
}

/// Statement sheets hold lecture or practice grades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    Lecture,
    Practice,
}

impl FromStr for StatementType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lecture" => Ok(StatementType::Lecture),
            "practice" => Ok(StatementType::Practice),
            other => Err(format!("unknown statement type `{}`", other)),
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementType::Lecture => write!(f, "lecture"),
            StatementType::Practice => write!(f, "practice"),
        }
    }
}

/// Location of a grade statement inside a spreadsheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub id: String,
    pub id_subject: String,
    pub id_subgroup: Option<String>,
    pub statement_type: StatementType,
    pub spreadsheet_id: String,
    pub sheet_id: String,
}

impl Statement {
    /// Browser link to the statement sheet
    pub fn url(&self) -> String {
        format!(
            "https://docs.google.com/spreadsheets/d/{}/edit#gid={}",
            self.spreadsheet_id, self.sheet_id
        )
    }
}

/// A study group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub id: String,
    pub title: String,
}

impl FromRecord for Student {
    fn from_record(record: &Record<'_>) -> Result<Self> {
        Ok(Self {
            id: record.required("id")?,
            telegram_id: record.required("telegram_id")?,
            isu_id: record.required("isu_id")?,
            id_group: record.required("id_group")?,
            first_name: record.required("first_name")?,
            last_name: record.required("last_name")?,
            patronymic: record.optional("patronymic"),
        })
    }
}

impl FromRecord for Teacher {
    fn from_record(record: &Record<'_>) -> Result<Self> {
        Ok(Self {
            id: record.required("id")?,
            telegram_id: record.required("telegram_id")?,
            first_name: record.required("first_name")?,
            last_name: record.required("last_name")?,
            patronymic: record.optional("patronymic"),
        })
    }
}

impl FromRecord for Subject {
    fn from_record(record: &Record<'_>) -> Result<Self> {
        Ok(Self {
            id: record.required("id")?,
            title: record.required("title")?,
            term: record.parse("term")?,
            id_group: record.required("id_group")?,
            id_teacher: record.required("id_teacher")?,
            link_to_csc: record.optional("link_to_csc"),
        })
    }
}

impl FromRecord for Subgroup {
    fn from_record(record: &Record<'_>) -> Result<Self> {
        Ok(Self {
            id: record.required("id")?,
            id_subject: record.required("id_subject")?,
            id_teacher: record.required("id_teacher")?,
            title: record.optional("title"),
        })
    }
}

impl FromRecord for Statement {
    fn from_record(record: &Record<'_>) -> Result<Self> {
        Ok(Self {
            id: record.required("id")?,
            id_subject: record.required("id_subject")?,
            id_subgroup: record.optional("id_subgroup"),
            statement_type: record.parse("statement_type")?,
            spreadsheet_id: record.required("spreadsheet_id")?,
            sheet_id: record.required("sheet_id")?,
        })
    }
}

impl FromRecord for Group {
    fn from_record(record: &Record<'_>) -> Result<Self> {
        Ok(Self {
            id: record.required("id")?,
            title: record.required("title")?,
        })
    }
}

impl Row for Student {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Row for Teacher {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Row for Subject {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Row for Subgroup {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Row for Statement {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Row for Group {
    fn id(&self) -> &str {
        &self.id
    }
}
