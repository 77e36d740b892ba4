//! Engine configuration.
//!
//! One explicit struct carries every knob; nothing is read from ambient state
//! inside the engine. `validate` is called before any work starts so a bad
//! option fails fast with a `Config` error naming the offending parameter.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::{ModelSpec, PeriodRange, ScenarioConfig};
use crate::error::{ForecastError, Result};

pub const DEFAULT_MIN_PERIODS: usize = 12;
pub const DEFAULT_LAG_DEPTH: usize = 3;
pub const DEFAULT_POLYNOMIAL_DEGREE: u8 = 2;
pub const MAX_POLYNOMIAL_DEGREE: u8 = 3;
pub const DEFAULT_VALIDATION_FRACTION: f64 = 0.2;
pub const DEFAULT_HORIZON_MONTHS: usize = 6;
pub const MAX_HORIZON_MONTHS: usize = 24;

/// Scenario name reserved for the unadjusted projection.
pub const BASELINE_SCENARIO: &str = "baseline";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum span (months) a series must cover.
    pub min_periods: usize,
    /// Optional explicit reindex range. Defaults to the observed span.
    pub requested_range: Option<PeriodRange>,
    pub lag_depth: usize,
    /// Include the sine/cosine month-of-year encoding.
    pub seasonal: bool,
    pub model: ModelSpec,
    pub polynomial_degree: u8,
    /// Trailing share of training rows held out for validation, `[0, 1)`.
    pub validation_fraction: f64,
    pub horizon_months: usize,
    pub scenarios: ScenarioConfig,
    /// Clamp forecasts at zero. Off by default: net figures may go negative.
    pub non_negative: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_periods: DEFAULT_MIN_PERIODS,
            requested_range: None,
            lag_depth: DEFAULT_LAG_DEPTH,
            seasonal: true,
            model: ModelSpec::Auto,
            polynomial_degree: DEFAULT_POLYNOMIAL_DEGREE,
            validation_fraction: DEFAULT_VALIDATION_FRACTION,
            horizon_months: DEFAULT_HORIZON_MONTHS,
            scenarios: ScenarioConfig::default(),
            non_negative: false,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_periods < 2 {
            return Err(ForecastError::config(
                "min_periods",
                format!("must be >= 2, got {}", self.min_periods),
            ));
        }
        validate_lag_depth(self.lag_depth, self.min_periods)?;
        validate_degree(self.polynomial_degree)?;
        validate_validation_fraction(self.validation_fraction)?;
        validate_horizon(self.horizon_months)?;
        validate_scenarios(&self.scenarios)?;
        Ok(())
    }
}

/// Every accepted series spans at least `min_periods` months, so a lag depth
/// below that always leaves a trainable row.
pub fn validate_lag_depth(lag_depth: usize, min_periods: usize) -> Result<()> {
    if lag_depth >= min_periods {
        return Err(ForecastError::config(
            "lag_depth",
            format!("must be below min_periods ({min_periods}), got {lag_depth}"),
        ));
    }
    Ok(())
}

pub fn validate_degree(degree: u8) -> Result<()> {
    if !(1..=MAX_POLYNOMIAL_DEGREE).contains(&degree) {
        return Err(ForecastError::config(
            "polynomial_degree",
            format!("must be in 1..={MAX_POLYNOMIAL_DEGREE}, got {degree}"),
        ));
    }
    Ok(())
}

pub fn validate_validation_fraction(fraction: f64) -> Result<()> {
    if !(fraction.is_finite() && (0.0..1.0).contains(&fraction)) {
        return Err(ForecastError::config(
            "validation_fraction",
            format!("must be in [0, 1), got {fraction}"),
        ));
    }
    Ok(())
}

pub fn validate_horizon(horizon: usize) -> Result<()> {
    if horizon == 0 || horizon > MAX_HORIZON_MONTHS {
        return Err(ForecastError::config(
            "horizon_months",
            format!("must be in 1..={MAX_HORIZON_MONTHS}, got {horizon}"),
        ));
    }
    Ok(())
}

pub fn validate_scenarios(config: &ScenarioConfig) -> Result<()> {
    let mut seen = HashSet::new();
    for adj in &config.adjustments {
        let name = adj.name.trim();
        if name.is_empty() {
            return Err(ForecastError::config("scenario_adjustments", "scenario name is empty"));
        }
        if name.eq_ignore_ascii_case(BASELINE_SCENARIO) {
            return Err(ForecastError::config(
                "scenario_adjustments",
                format!("'{name}' is reserved for the unadjusted forecast"),
            ));
        }
        if !seen.insert(name.to_string()) {
            return Err(ForecastError::config(
                "scenario_adjustments",
                format!("duplicate scenario name '{name}'"),
            ));
        }
        if !(adj.rate.is_finite() && adj.rate > -1.0) {
            return Err(ForecastError::config(
                "scenario_adjustments",
                format!("rate for '{name}' must be finite and > -1, got {}", adj.rate),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScenarioAdjustment;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_options() {
        let cases: Vec<(EngineConfig, &str)> = vec![
            (
                EngineConfig {
                    polynomial_degree: 4,
                    ..EngineConfig::default()
                },
                "polynomial_degree",
            ),
            (
                EngineConfig {
                    horizon_months: 25,
                    ..EngineConfig::default()
                },
                "horizon_months",
            ),
            (
                EngineConfig {
                    lag_depth: 40,
                    ..EngineConfig::default()
                },
                "lag_depth",
            ),
            (
                EngineConfig {
                    lag_depth: 12,
                    min_periods: 12,
                    ..EngineConfig::default()
                },
                "lag_depth",
            ),
            (
                EngineConfig {
                    validation_fraction: 1.0,
                    ..EngineConfig::default()
                },
                "validation_fraction",
            ),
        ];
        for (config, expected) in cases {
            match config.validate().unwrap_err() {
                ForecastError::Config { parameter, .. } => assert_eq!(parameter, expected),
                other => panic!("expected config error, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_duplicate_and_reserved_scenario_names() {
        let dup = ScenarioConfig {
            adjustments: vec![
                ScenarioAdjustment::new("upside", 0.1),
                ScenarioAdjustment::new("upside", 0.2),
            ],
            ..ScenarioConfig::default()
        };
        assert!(validate_scenarios(&dup).is_err());

        let reserved = ScenarioConfig {
            adjustments: vec![ScenarioAdjustment::new("Baseline", 0.0)],
            ..ScenarioConfig::default()
        };
        assert!(validate_scenarios(&reserved).is_err());
    }
}
