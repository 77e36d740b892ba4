//! Accuracy evaluator: MAPE, RMSE, variance % and R-squared.

pub mod accuracy;

pub use accuracy::*;
