//! Field-addressable view over one sheet row

use std::str::FromStr;

use crate::error::{Error, Result};

/// One row of a sheet, addressed by column name
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    fields: &'a [String],
    values: &'a [String],
    index: usize,
}

impl<'a> Record<'a> {
    pub(crate) fn new(fields: &'a [String], values: &'a [String], index: usize) -> Self {
        Self {
            fields,
            values,
            index,
        }
    }

    /// Zero-based position of the row in its sheet
    pub fn index(&self) -> usize {
        self.index
    }

    /// Value of `field`, or `None` when the column is missing or the cell is empty
    pub fn get(&self, field: &str) -> Option<&'a str> {
        let pos = self.fields.iter().position(|f| f == field)?;
        self.values
            .get(pos)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Owned value of an optional `field`
    pub fn optional(&self, field: &str) -> Option<String> {
        self.get(field).map(str::to_string)
    }

    /// Owned value of a mandatory `field`
    pub fn required(&self, field: &str) -> Result<String> {
        self.get(field).map(str::to_string).ok_or_else(|| {
            Error::Schema(format!("row {}: missing value for `{}`", self.index, field))
        })
    }

    /// Mandatory `field` parsed with [`FromStr`]
    pub fn parse<T>(&self, field: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.required(field)?;
        raw.parse().map_err(|e: T::Err| {
            Error::Schema(format!(
                "row {}: invalid value `{}` for `{}`: {}",
                self.index, raw, field, e
            ))
        })
    }
}

/// Types that can be decoded from a sheet row
pub trait FromRecord: Sized {
    /// Decode one row
    fn from_record(record: &Record<'_>) -> Result<Self>;
}
