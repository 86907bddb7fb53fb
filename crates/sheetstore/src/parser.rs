//! Sheet format parser using nom
//!
//! Sheet format:
//! ```text
//! # comments and blank lines are ignored
//! collection[count]{field1,field2,...}:
//!   value1,value2,...
//!   value1,"value, with comma",...
//! ```
//!
//! The bracketed count must match the number of rows, and every row must
//! carry one value per declared field. Empty values are kept as empty
//! strings; [`Record`](crate::Record) treats them as absent.

use std::collections::HashSet;

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1, space0},
    combinator::{all_consuming, map, map_res},
    multi::separated_list1,
    sequence::{delimited, terminated, tuple},
    IResult,
};

use crate::error::{Error, Result};
use crate::record::{FromRecord, Record};

/// Sheet header line
#[derive(Debug, Clone, PartialEq)]
pub struct SheetHeader {
    /// Table name, e.g. `subjects`
    pub name: String,
    /// Declared number of rows
    pub row_count: usize,
    /// Column names in declaration order
    pub fields: Vec<String>,
}

/// A parsed sheet: header plus raw row values
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    /// Header line
    pub header: SheetHeader,
    /// Raw values, one vector per row, aligned with `header.fields`
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Iterate rows as field-addressable records
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, values)| Record::new(&self.header.fields, values, index))
    }

    /// Decode every row, failing on the first row that does not decode
    pub fn decode<R: FromRecord>(&self) -> Result<Vec<R>> {
        self.records().map(|record| R::from_record(&record)).collect()
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')(input)
}

fn padded_identifier(input: &str) -> IResult<&str, &str> {
    delimited(space0, identifier, space0)(input)
}

fn row_count(input: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse::<usize>)(input)
}

/// Parse a header line: `name[count]{field,...}:`
fn header(input: &str) -> IResult<&str, SheetHeader> {
    map(
        terminated(
            tuple((
                identifier,
                delimited(char('['), row_count, char(']')),
                delimited(
                    char('{'),
                    separated_list1(char(','), padded_identifier),
                    char('}'),
                ),
            )),
            tuple((char(':'), space0)),
        ),
        |(name, row_count, fields)| SheetHeader {
            name: name.to_string(),
            row_count,
            fields: fields.into_iter().map(str::to_string).collect(),
        },
    )(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    delimited(
        space0,
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        space0,
    )(input)
}

fn bare(input: &str) -> IResult<&str, &str> {
    map(take_while(|c: char| c != ',' && c != '"'), str::trim)(input)
}

/// Parse one row of comma-separated values
fn values(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list1(char(','), alt((quoted, bare)))(input)
}

fn describe(err: nom::Err<nom::error::Error<&str>>) -> String {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let near: String = e.input.chars().take(16).collect();
            format!("unexpected input near `{}` ({:?})", near, e.code)
        }
        nom::Err::Incomplete(_) => "incomplete input".to_string(),
    }
}

fn significant(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && !line.starts_with('#')
}

/// Parse a whole sheet
pub fn parse_sheet(input: &str) -> Result<Sheet> {
    let mut lines = input
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(_, line)| significant(line));

    let (header_line, text) = lines
        .next()
        .ok_or_else(|| Error::parse(1, "missing sheet header"))?;
    let (_, header) = all_consuming(header)(text.trim())
        .map_err(|e| Error::parse(header_line, describe(e)))?;

    {
        let mut seen = HashSet::new();
        if let Some(dup) = header.fields.iter().find(|f| !seen.insert(f.as_str())) {
            return Err(Error::Schema(format!(
                "sheet `{}` declares field `{}` twice",
                header.name, dup
            )));
        }
    }

    let mut rows = Vec::with_capacity(header.row_count);
    for (line, text) in lines {
        let (_, row) =
            all_consuming(values)(text.trim()).map_err(|e| Error::parse(line, describe(e)))?;
        if row.len() != header.fields.len() {
            return Err(Error::Schema(format!(
                "line {}: expected {} values, found {}",
                line,
                header.fields.len(),
                row.len()
            )));
        }
        rows.push(row.into_iter().map(str::to_string).collect());
    }

    if rows.len() != header.row_count {
        return Err(Error::Schema(format!(
            "sheet `{}` declares {} rows, found {}",
            header.name,
            header.row_count,
            rows.len()
        )));
    }

    Ok(Sheet { header, rows })
}
