//! Grade statistics for a spreadsheet of student results.
//!
//! The binary in `main.rs` wires these modules to the command line.

pub mod aggregate;
pub mod auth;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod report;
pub mod session;
pub mod shell;

pub use aggregate::{aggregate, PASS_MARK};
pub use models::{AggregationResult, CellValue, Grade, Percentage, RowRecord};
