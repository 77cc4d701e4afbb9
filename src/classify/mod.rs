//! Structural classification of a dataset.
//!
//! - `roles`: entity / time column resolution from a keyword table
//! - `structure`: layout and panel balance
//! - `linearity`: Pearson vs Spearman divergence
//! - `metadata`: the combined `Metadata` record and its summary

pub mod linearity;
pub mod metadata;
pub mod roles;
pub mod structure;

pub use linearity::{PairLinearity, is_linear, pairwise_linearity};
pub use metadata::{detect, summary};
pub use roles::{ResolvedRoles, Role};
pub use structure::{detect_layout, detect_panel_balance};
