//! Regression model evaluation.
//!
//! Models are implemented as small, pure functions over a `Term` layout so that
//! fitting and projection code can stay generic over the model kind.

pub mod model;

pub use model::*;
