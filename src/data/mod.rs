//! Tabular data model and synthetic data generators.

pub mod dataset;
pub mod sample;

pub use dataset::*;
