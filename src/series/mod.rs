//! Time index builder: raw rows -> gap-checked monthly series.

pub mod index;

pub use index::*;
