//! Scenario composer: named adjustments over a shared baseline.

pub mod composer;

pub use composer::*;
