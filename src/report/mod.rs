//! Reporting utilities: formatted terminal output for runs and saved reports.

pub mod format;

pub use format::*;
