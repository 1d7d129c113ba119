//! Output formatting module
//!
//! Renders run reports for the terminal and for files.

mod formatter;

pub use formatter::{write_report_to_file, OutputFormat, ReportFormatter};
