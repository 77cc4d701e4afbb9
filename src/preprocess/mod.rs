//! Preparation of a dataset for estimation.
//!
//! Classification and stationarity look at the data as loaded. Before the
//! estimators run, gaps are handled and, for big datasets, the features are
//! standardized. Every change is reported.

pub mod missing;
pub mod scaling;

use serde::Serialize;

pub use missing::{ColumnTreatment, MissingAction, handle_missing};
pub use scaling::{ScaledColumn, standardize};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreprocessReport {
    pub missing: Vec<ColumnTreatment>,
    pub scaling: Vec<ScaledColumn>,
}

impl PreprocessReport {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.scaling.is_empty()
    }
}
