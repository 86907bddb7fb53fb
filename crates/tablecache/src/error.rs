//! Error types for tablecache

use std::sync::Arc;

use thiserror::Error;

/// Result type alias for cache lookups
pub type Result<T> = std::result::Result<T, Error>;

/// Lookup failures
///
/// An empty result is never an error: a group key with no rows resolves to
/// an empty vector.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The table source failed while refreshing; the caller may retry
    #[error("failed to fetch table `{table}`: {source}")]
    FetchFailed {
        /// Table name
        table: String,
        /// Error reported by the source, shared by every caller of that refresh
        source: Arc<sheetstore::Error>,
    },

    /// The table is loaded but has no row with this id
    #[error("no row `{id}` in table `{table}`")]
    NotFound {
        /// Table name
        table: String,
        /// Requested id or key
        id: String,
    },

    /// A secondary index is not in the store (never built, expired or evicted)
    #[error("index `{index}` of table `{table}` is not available")]
    IndexUnavailable {
        /// Table name
        table: String,
        /// Index name
        index: String,
    },

    /// No secondary index with this name was registered
    #[error("table `{table}` has no index named `{index}`")]
    UnknownIndex {
        /// Table name
        table: String,
        /// Index name
        index: String,
    },
}

impl Error {
    /// The query was valid and nothing matched
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// The lookup may succeed if repeated later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::FetchFailed { .. } | Error::IndexUnavailable { .. }
        )
    }
}
