//! # smd
//!
//! Student Manager Daemon: answers student and teacher questions from
//! academic sheets, each table cached in a [`tablecache::TableCache`].
//!
//! - [`tables`]: one cached facade per sheet with its lookup indices
//! - [`queries`]: domain questions composed from several tables
//! - [`handler`]: the line protocol spoken by `smd serve`
//! - [`server`]: TCP accept loop feeding lines to the handler

pub mod config;
pub mod handler;
pub mod model;
pub mod queries;
pub mod server;
pub mod tables;
#[cfg(test)]
mod testdata;
