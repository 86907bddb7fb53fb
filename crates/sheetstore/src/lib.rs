//! # sheetstore
//!
//! Row sources for the Student Manager table cache.
//!
//! A source hands out the whole table in one call; there is no pagination or
//! filtering pushed down. The bundled [`SheetFile`] reads one text sheet per
//! table from a data directory:
//!
//! ```text
//! subjects[2]{id,title,id_group}:
//!   s1,Algebra,g1
//!   s2,"Logic, intro",g1
//! ```

#![warn(missing_docs)]

mod error;
mod parser;
mod record;
mod source;

pub use error::{Error, Result};
pub use parser::{parse_sheet, Sheet, SheetHeader};
pub use record::{FromRecord, Record};
pub use source::{SheetFile, TableSource, SHEET_EXTENSION};
