//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - forecast and observation CSV exports (`export`)
//! - run report JSON read/write (`report`)

pub mod export;
pub mod ingest;
pub mod report;

pub use export::*;
pub use ingest::*;
pub use report::*;
