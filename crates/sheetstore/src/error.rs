//! Error types for sheetstore

use std::io;

use thiserror::Error;

/// Result type alias for sheet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while fetching or decoding a table
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while reading a sheet
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed sheet text
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Sheet is well-formed but does not match the expected table shape
    #[error("schema error: {0}")]
    Schema(String),

    /// Remote source refused or failed the request (network, quota)
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}
