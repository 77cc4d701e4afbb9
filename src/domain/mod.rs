//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - classification enums (`Layout`, `PanelBalance`, `SizeCategory`)
//! - the per-run `Metadata` record and `AnalysisConfig`
//! - outputs (`IntegrationOrder`, `EstimatorFamily`, `ModelCandidate`)

pub mod types;

pub use types::*;
