//! Recursive multi-step projection.
//!
//! Lag features reference the target itself, so beyond the last observed
//! month every prediction becomes the newest lag of the next step. Errors
//! compound along the way, which is why the horizon is capped.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{FittedModel, ForecastPoint, ForecastResult, MonthPeriod, ObservationSeries, PeriodRange, validate_horizon};
use crate::error::{ErrorContext, ForecastError, Result};
use crate::models::{DesignInputs, predict_model};

/// Where the projection starts and the lag values it starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSeed {
    pub next_period: MonthPeriod,
    /// Time index of `next_period` on the fitted series' grid.
    pub next_time_index: usize,
    /// Most recent actuals, newest first (`recent[0]` is `lag_1`).
    pub recent: Vec<f64>,
}

impl ForecastSeed {
    /// Seed from the tail of a series.
    ///
    /// Trailing months without an actual (a requested range that runs past
    /// the data) are dropped, so the projection starts right after the last
    /// observed month. The `lag_depth` months before that must be observed;
    /// a gap there leaves the first step without inputs.
    pub fn from_series(series: &ObservationSeries, lag_depth: usize) -> Result<Self> {
        let points = series.points();
        let range = series.range();
        let ctx = || ErrorContext::category(series.category()).with_range(range);

        let Some(last) = points.iter().rposition(|p| p.actual.is_some()) else {
            return Err(ForecastError::data(ctx(), "no observed months to seed from"));
        };
        let observed = &points[..=last];
        if last + 1 < points.len() {
            debug!(
                category = series.category(),
                last_observed = %observed[last].period,
                trailing_gap = points.len() - observed.len(),
                "projecting across trailing months without actuals"
            );
        }
        if lag_depth > observed.len() {
            return Err(ForecastError::data(
                ctx(),
                format!("need {lag_depth} trailing months to seed lags, series has {}", observed.len()),
            ));
        }

        let mut recent = Vec::with_capacity(lag_depth);
        for point in observed.iter().rev().take(lag_depth) {
            let Some(actual) = point.actual else {
                return Err(ForecastError::data(
                    ctx(),
                    format!("cannot seed lags: {} is missing", point.period),
                ));
            };
            recent.push(actual);
        }

        Ok(Self {
            next_period: observed[last].period.succ(),
            next_time_index: observed.len(),
            recent,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastOptions {
    pub horizon: usize,
    /// Clamp predictions at zero. Off unless the caller asks for it.
    pub non_negative: bool,
}

/// Project `model` forward `options.horizon` months.
///
/// The returned result carries the baseline only; scenarios are derived from
/// it by the composer.
pub fn forecast(model: &FittedModel, seed: &ForecastSeed, options: &ForecastOptions) -> Result<ForecastResult> {
    validate_horizon(options.horizon)?;

    let lag_depth = model.feature_spec.lag_depth;
    if seed.recent.len() < lag_depth {
        return Err(ForecastError::data(
            ErrorContext::category(model.category.clone()),
            format!("model uses {lag_depth} lags but only {} seed values were given", seed.recent.len()),
        ));
    }

    let mut lags: Vec<f64> = seed.recent[..lag_depth].to_vec();
    let mut baseline = Vec::with_capacity(options.horizon);

    for step in 0..options.horizon {
        let period = seed.next_period.offset(step as i64);
        let inputs = DesignInputs {
            time_index: seed.next_time_index + step,
            month: period.month(),
            lags: &lags,
        };
        let mut value = predict_model(model, &inputs);
        if !value.is_finite() {
            return Err(ForecastError::fit(
                ErrorContext::category(model.category.clone()).with_range(PeriodRange::new(period, period)),
                format!("projection diverged at step {}", step + 1),
            ));
        }
        if options.non_negative {
            value = value.max(0.0);
        }
        baseline.push(ForecastPoint { period, value });

        if lag_depth > 0 {
            lags.rotate_right(1);
            lags[0] = value;
        }
    }

    let horizon_end = seed.next_period.offset(options.horizon as i64 - 1);
    debug!(
        category = %model.category,
        model = %model.kind.display_name(),
        start = %seed.next_period,
        end = %horizon_end,
        "projected baseline"
    );

    Ok(ForecastResult {
        category: model.category.clone(),
        horizon_start: seed.next_period,
        horizon_end,
        baseline,
        scenarios: BTreeMap::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureSpec, ModelKind, Term};
    use crate::fit::fit_model;
    use crate::testutil::{feature_set, series};

    fn options(horizon: usize) -> ForecastOptions {
        ForecastOptions {
            horizon,
            non_negative: false,
        }
    }

    #[test]
    fn constant_series_forecasts_constant() {
        let values = vec![100.0; 24];
        let fit = fit_model(ModelKind::Linear, &feature_set(&values, 0, true), 0.2).unwrap();
        let seed = ForecastSeed::from_series(&series(&values), 0).unwrap();
        let result = forecast(&fit.model, &seed, &options(6)).unwrap();

        assert_eq!(result.baseline.len(), 6);
        assert_eq!(result.horizon_start.to_string(), "2024-01");
        assert_eq!(result.horizon_end.to_string(), "2024-06");
        assert!(result.baseline.iter().all(|p| (p.value - 100.0).abs() < 1e-8));
        assert!(result.scenarios.is_empty());
    }

    #[test]
    fn lags_are_fed_back() {
        let values: Vec<f64> = (0..20).map(|i| 10.0 + 2.0 * i as f64).collect();
        let seed = ForecastSeed::from_series(&series(&values), 2).unwrap();
        assert_eq!(seed.recent, vec![48.0, 46.0]);
        assert_eq!(seed.next_time_index, 20);

        // y_t = 2 + y_{t-1}
        let model = FittedModel {
            category: "Sales".to_string(),
            kind: ModelKind::Linear,
            coefficients: vec![2.0, 1.0, 0.0],
            terms: vec![Term::Intercept, Term::Lag { n: 1 }, Term::Lag { n: 2 }],
            feature_spec: FeatureSpec {
                lag_depth: 2,
                seasonal: false,
                trend_scale: 19.0,
            },
            train_window: series(&values).range(),
        };
        let result = forecast(&model, &seed, &options(3)).unwrap();
        assert_eq!(result.baseline_values(), vec![50.0, 52.0, 54.0]);
    }

    #[test]
    fn prefix_consistent() {
        let values: Vec<f64> = (0..30)
            .map(|i| 100.0 + i as f64 + 8.0 * (i as f64 * 0.9).sin())
            .collect();
        let fit = fit_model(ModelKind::Linear, &feature_set(&values, 2, true), 0.2).unwrap();
        let seed = ForecastSeed::from_series(&series(&values), 2).unwrap();
        let long = forecast(&fit.model, &seed, &options(12)).unwrap();
        let short = forecast(&fit.model, &seed, &options(5)).unwrap();
        assert_eq!(&long.baseline[..5], &short.baseline[..]);
    }

    #[test]
    fn horizon_bounds_are_config_errors() {
        let values = vec![100.0; 24];
        let fit = fit_model(ModelKind::Linear, &feature_set(&values, 0, false), 0.2).unwrap();
        let seed = ForecastSeed::from_series(&series(&values), 0).unwrap();
        for horizon in [0, 25] {
            let err = forecast(&fit.model, &seed, &options(horizon)).unwrap_err();
            assert!(matches!(err, ForecastError::Config { parameter: "horizon_months", .. }));
        }
        assert!(forecast(&fit.model, &seed, &options(24)).is_ok());
    }

    #[test]
    fn clamp_is_opt_in() {
        let values: Vec<f64> = (0..24).map(|i| 230.0 - 10.0 * i as f64).collect();
        let fit = fit_model(ModelKind::Linear, &feature_set(&values, 0, false), 0.2).unwrap();
        let seed = ForecastSeed::from_series(&series(&values), 0).unwrap();

        let raw = forecast(&fit.model, &seed, &options(6)).unwrap();
        assert!(raw.baseline.iter().any(|p| p.value < 0.0));

        let clamped = forecast(&fit.model, &seed, &ForecastOptions { horizon: 6, non_negative: true }).unwrap();
        assert!(clamped.baseline.iter().all(|p| p.value >= 0.0));
    }

    #[test]
    fn missing_tail_cannot_seed() {
        let values: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let mut rows = crate::testutil::monthly_rows("Sales", &values, None);
        rows.remove(10);
        let opts = crate::series::IndexOptions {
            min_periods: 2,
            range: None,
        };
        let s = crate::series::build_series("Sales", &rows, &opts).unwrap();
        assert!(ForecastSeed::from_series(&s, 1).is_ok());
        let err = ForecastSeed::from_series(&s, 2).unwrap_err();
        assert!(matches!(err, ForecastError::Data { .. }));
    }

    #[test]
    fn range_past_the_data_projects_from_last_observation() {
        let values: Vec<f64> = (0..24).map(|i| 100.0 + i as f64).collect();
        let rows = crate::testutil::monthly_rows("Sales", &values, None);
        let opts = crate::series::IndexOptions {
            min_periods: 2,
            range: Some(PeriodRange::new(
                MonthPeriod::new(2022, 1).unwrap(),
                MonthPeriod::new(2024, 3).unwrap(),
            )),
        };
        let s = crate::series::build_series("Sales", &rows, &opts).unwrap();
        assert_eq!(s.len(), 27);

        let seed = ForecastSeed::from_series(&s, 3).unwrap();
        assert_eq!(seed.next_period.to_string(), "2024-01");
        assert_eq!(seed.next_time_index, 24);
        assert_eq!(seed.recent, vec![123.0, 122.0, 121.0]);
    }
}
