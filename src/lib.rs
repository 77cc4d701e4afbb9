//! `autostat` library crate.
//!
//! The binary (`autostat`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the classifiers, the consensus engine and the dispatcher are reusable
//!   on in-memory datasets

pub mod app;
pub mod classify;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod models;
pub mod preprocess;
pub mod report;
pub mod stationarity;
