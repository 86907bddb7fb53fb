//! Table sources: the slow side the cache sits in front of

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::parser::parse_sheet;
use crate::record::FromRecord;

/// File extension of sheet files in a data directory
pub const SHEET_EXTENSION: &str = "toon";

/// Supplies the full row set of one logical table
///
/// Every call returns the complete, ordered table. Implementations may be
/// slow and may fail; callers decide whether to retry.
#[async_trait]
pub trait TableSource<R>: Send + Sync {
    /// Fetch every row of the table
    async fn fetch_all(&self) -> Result<Vec<R>>;
}

/// Table backed by a sheet file at `<dir>/<table>.toon`
///
/// The file is re-read on every fetch, so edits are picked up by the next
/// cache refresh.
pub struct SheetFile<R> {
    table: String,
    path: PathBuf,
    _row: PhantomData<fn() -> R>,
}

impl<R> SheetFile<R> {
    /// Point at the sheet for `table` inside `dir`
    ///
    /// No I/O happens here; a missing file surfaces on the first fetch.
    pub fn new<P: AsRef<Path>>(dir: P, table: impl Into<String>) -> Self {
        let table = table.into();
        let path = dir
            .as_ref()
            .join(format!("{}.{}", table, SHEET_EXTENSION));
        Self {
            table,
            path,
            _row: PhantomData,
        }
    }

    /// Table name the sheet header must carry
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Path of the sheet file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl<R> TableSource<R> for SheetFile<R>
where
    R: FromRecord + Send + 'static,
{
    async fn fetch_all(&self) -> Result<Vec<R>> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let sheet = parse_sheet(&text)?;

        if sheet.header.name != self.table {
            return Err(Error::Schema(format!(
                "{} holds table `{}`, expected `{}`",
                self.path.display(),
                sheet.header.name,
                self.table
            )));
        }

        let rows = sheet.decode()?;
        debug!(table = %self.table, rows = sheet.rows.len(), "Read sheet");
        Ok(rows)
    }
}
