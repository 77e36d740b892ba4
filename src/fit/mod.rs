//! Model fitting orchestration.
//!
//! Responsibilities:
//!
//! - chronological train / validation split and OLS per candidate kind
//! - fit candidates (parallel) and select on validation error
//! - keep fitted selections in a caller-owned keyed store

pub mod cache;
pub mod fitter;
pub mod selection;

pub use cache::*;
pub use fitter::*;
pub use selection::*;
