//! Input/output helpers.
//!
//! - CSV ingest with column type inference (`ingest`)
//! - run exports (JSON/CSV) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
