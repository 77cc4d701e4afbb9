//! Mathematical utilities: least squares and descriptive statistics.

pub mod ols;
pub mod stats;

pub use ols::*;
