//! Tabular output of the collected articles.
//!
//! Every sink receives the whole [`ResultSet`] once, at the end of a run,
//! and writes the columns in [`COLUMNS`] order, one row per record.
//!
//! # Submodules
//!
//! - [`xlsx`]: single-sheet Excel workbook

use crate::error::OutputError;
use crate::models::ResultSet;

pub mod xlsx;

/// Header row, in column order.
pub const COLUMNS: [&str; 7] = [
    "Title",
    "Date",
    "Description",
    "Title Count",
    "Description Count",
    "Money Present",
    "Picture Filename",
];

/// Destination for the finished result set.
pub trait TabularSink {
    fn write(&self, results: &ResultSet) -> Result<(), OutputError>;
}
