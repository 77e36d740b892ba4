//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - calendar-month arithmetic (`MonthPeriod`, `PeriodRange`)
//! - series, feature and model value types (`ObservationSeries`, `FeatureRow`, `FittedModel`, ...)
//! - forecast, accuracy and scenario outputs
//! - the explicit engine configuration (`EngineConfig`)
//! - the portable JSON run report (`ForecastReport`)

pub mod config;
pub mod period;
pub mod report;
pub mod types;

pub use config::*;
pub use period::*;
pub use report::*;
pub use types::*;
