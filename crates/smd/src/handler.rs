//! Command handler for the line protocol

use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tablecache::MemoryStore;
use tracing::debug;

use crate::queries::Queries;
use crate::tables::Tables;

/// One request line, already split into its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Student(String),
    StudentSubjects(String),
    SubjectInfo {
        telegram_id: String,
        subject_id: String,
    },
    TeacherSubjects(String),
    Stats,
}

fn arity(name: &str, args: &[&str], expected: usize) -> Result<(), String> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(format!(
            "wrong number of arguments for '{}' command",
            name.to_ascii_lowercase()
        ))
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words
            .next()
            .ok_or_else(|| "empty command".to_string())?
            .to_ascii_uppercase();
        let args: Vec<&str> = words.collect();

        match name.as_str() {
            "PING" => arity(&name, &args, 0).map(|_| Command::Ping),
            "STATS" => arity(&name, &args, 0).map(|_| Command::Stats),
            "STUDENT" => arity(&name, &args, 1).map(|_| Command::Student(args[0].to_string())),
            "STUDENT_SUBJECTS" => {
                arity(&name, &args, 1).map(|_| Command::StudentSubjects(args[0].to_string()))
            }
            "SUBJECT_INFO" => arity(&name, &args, 2).map(|_| Command::SubjectInfo {
                telegram_id: args[0].to_string(),
                subject_id: args[1].to_string(),
            }),
            "TEACHER_SUBJECTS" => {
                arity(&name, &args, 1).map(|_| Command::TeacherSubjects(args[0].to_string()))
            }
            _ => Err(format!("unknown command '{}'", name)),
        }
    }
}

/// One response line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok { data: Value },
    NotFound { error: String },
    Unavailable { error: String },
    BadRequest { error: String },
}

impl Response {
    fn from_result<T: Serialize>(result: tablecache::Result<T>) -> Self {
        match result {
            Ok(data) => match serde_json::to_value(data) {
                Ok(data) => Response::Ok { data },
                Err(e) => Response::Unavailable {
                    error: format!("cannot encode response: {}", e),
                },
            },
            Err(e) if e.is_not_found() => Response::NotFound {
                error: e.to_string(),
            },
            Err(e) => Response::Unavailable {
                error: e.to_string(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok { .. })
    }

    /// JSON text of the response, without the trailing newline
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            json!({ "status": "unavailable", "error": e.to_string() }).to_string()
        })
    }
}

pub struct CommandHandler {
    tables: Arc<Tables>,
    queries: Queries,
    store: Arc<MemoryStore>,
}

impl CommandHandler {
    pub fn new(tables: Arc<Tables>, store: Arc<MemoryStore>) -> Self {
        Self {
            queries: Queries::new(Arc::clone(&tables)),
            tables,
            store,
        }
    }

    pub async fn handle(&self, line: &str) -> Response {
        match line.parse::<Command>() {
            Ok(command) => {
                debug!(?command, "Handling command");
                self.execute(command).await
            }
            Err(error) => Response::BadRequest { error },
        }
    }

    pub async fn execute(&self, command: Command) -> Response {
        match command {
            Command::Ping => Response::Ok {
                data: json!("PONG"),
            },
            Command::Student(tg) => Response::from_result(self.queries.student(&tg).await),
            Command::StudentSubjects(tg) => {
                Response::from_result(self.queries.student_subjects(&tg).await)
            }
            Command::SubjectInfo {
                telegram_id,
                subject_id,
            } => Response::from_result(
                self.queries
                    .subject_info(&telegram_id, &subject_id)
                    .await,
            ),
            Command::TeacherSubjects(tg) => {
                Response::from_result(self.queries.teacher_subjects(&tg).await)
            }
            Command::Stats => Response::Ok {
                data: self.stats(),
            },
        }
    }

    fn stats(&self) -> Value {
        let tables: serde_json::Map<String, Value> = self
            .tables
            .stats()
            .into_iter()
            .map(|(table, stats)| {
                let value = json!({
                    "hits": stats.hits(),
                    "misses": stats.misses(),
                    "fetches": stats.fetches(),
                    "fetch_failures": stats.fetch_failures(),
                    "shared": stats.shared(),
                    "hit_ratio": stats.hit_ratio(),
                });
                (table.to_string(), value)
            })
            .collect();

        json!({
            "tables": tables,
            "store": {
                "entries": self.store.len(),
                "capacity": self.store.capacity(),
                "evictions": self.store.stats().evictions(),
                "expirations": self.store.stats().expirations(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata;
    use tablecache::{CacheStore, TableCacheConfig};
    use tempfile::TempDir;

    fn handler(dir: &TempDir) -> CommandHandler {
        let store = Arc::new(MemoryStore::new(64));
        let shared: Arc<dyn CacheStore> = Arc::clone(&store) as Arc<dyn CacheStore>;
        let tables = Tables::open(dir.path(), shared, &TableCacheConfig::default());
        CommandHandler::new(Arc::new(tables), store)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("ping".parse::<Command>(), Ok(Command::Ping));
        assert_eq!(
            "  SUBJECT_INFO 1001   s1 ".parse::<Command>(),
            Ok(Command::SubjectInfo {
                telegram_id: "1001".to_string(),
                subject_id: "s1".to_string(),
            })
        );
        assert_eq!(
            "student".parse::<Command>(),
            Err("wrong number of arguments for 'student' command".to_string())
        );
        assert_eq!(
            "GRADES 1001".parse::<Command>(),
            Err("unknown command 'GRADES'".to_string())
        );
        assert!("".parse::<Command>().is_err());
    }

    #[tokio::test]
    async fn test_ping() {
        let dir = testdata::data_dir();
        let handler = handler(&dir);

        let resp = handler.handle("PING").await;
        assert_eq!(resp.to_line(), r#"{"status":"ok","data":"PONG"}"#);
    }

    #[tokio::test]
    async fn test_student() {
        let dir = testdata::data_dir();
        let handler = handler(&dir);

        let Response::Ok { data } = handler.handle("STUDENT 1001").await else {
            panic!("expected ok");
        };
        assert_eq!(data["id"], "st1");
        assert_eq!(data["id_group"], "g1");
        assert_eq!(data["patronymic"], "Sergeevna");
    }

    #[tokio::test]
    async fn test_not_found() {
        let dir = testdata::data_dir();
        let handler = handler(&dir);

        let resp = handler.handle("STUDENT 404").await;
        assert!(matches!(resp, Response::NotFound { .. }));
        assert!(resp.to_line().starts_with(r#"{"status":"not_found","error":"#));
    }

    #[tokio::test]
    async fn test_unavailable_when_sheet_missing() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir);

        let resp = handler.handle("STUDENT_SUBJECTS 1001").await;
        assert!(matches!(resp, Response::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_bad_request() {
        let dir = testdata::data_dir();
        let handler = handler(&dir);

        let resp = handler.handle("SUBJECT_INFO 1001").await;
        assert_eq!(
            resp,
            Response::BadRequest {
                error: "wrong number of arguments for 'subject_info' command".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_subject_info_and_teacher_subjects() {
        let dir = testdata::data_dir();
        let handler = handler(&dir);

        let Response::Ok { data } = handler.handle("SUBJECT_INFO 1001 s1").await else {
            panic!("expected ok");
        };
        assert_eq!(data["subject"]["title"], "Algebra");
        assert_eq!(data["lecturer"]["last_name"], "Kuznetsova");
        assert_eq!(
            data["lecture_statement"],
            "https://docs.google.com/spreadsheets/d/1aBcD/edit#gid=0"
        );

        let Response::Ok { data } = handler.handle("teacher_subjects 2002").await else {
            panic!("expected ok");
        };
        let ids: Vec<_> = data
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["s2", "s1", "s3"]);
    }

    #[tokio::test]
    async fn test_stats() {
        let dir = testdata::data_dir();
        let handler = handler(&dir);

        assert!(handler.handle("STUDENT 1001").await.is_ok());
        assert!(handler.handle("STUDENT 1002").await.is_ok());

        let Response::Ok { data } = handler.handle("STATS").await else {
            panic!("expected ok");
        };
        assert_eq!(data["tables"]["students"]["fetches"], 1);
        assert_eq!(data["tables"]["subjects"]["fetches"], 0);
        assert_eq!(data["store"]["capacity"], 64);
        assert_eq!(data["store"]["entries"], 2);
    }
}
