//! Feature engineer: series -> trend, calendar and lag features.

pub mod engineer;

pub use engineer::*;
