//! Reporting: formatted terminal output for a run.
//!
//! Formatting lives in one place so the analysis code stays free of
//! presentation concerns.

pub mod format;

pub use format::{format_integration, format_run_summary, format_selection};
