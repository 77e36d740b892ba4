//! `fin-forecast` library crate.
//!
//! The binary (`fcast`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - every pipeline stage (series, features, fit, forecast, scenarios) can be
//!   driven on its own
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod eval;
pub mod features;
pub mod fit;
pub mod forecast;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod scenario;
pub mod series;

#[cfg(test)]
pub(crate) mod testutil;
