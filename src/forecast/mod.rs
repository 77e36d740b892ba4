//! Forecaster: fitted model -> bounded recursive projection.

pub mod projector;

pub use projector::*;
