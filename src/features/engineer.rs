//! Feature engineering.
//!
//! For every month of an `ObservationSeries` we derive:
//!
//! - `time_index` (0-based position on the grid)
//! - calendar fields (`month`, `quarter`) plus the periodic encoding
//! - `lag_1..lag_k` of the target
//!
//! Rows with any unknown lag, or with no target (a gap month), cannot be
//! trained on. They are returned separately as prediction-only rows so that
//! in-sample scoring still covers the full history.

use tracing::trace;

use crate::domain::{EngineConfig, FeatureRow, FeatureSpec, ObservationSeries};
use crate::error::{ErrorContext, ForecastError, Result};
use crate::math::{month_cos, month_sin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureConfig {
    pub lag_depth: usize,
    pub seasonal: bool,
}

impl From<&EngineConfig> for FeatureConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            lag_depth: config.lag_depth,
            seasonal: config.seasonal,
        }
    }
}

/// Engineered rows for one series, split by trainability.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub category: String,
    pub spec: FeatureSpec,
    /// Complete rows (target and every lag known), in period order.
    pub training: Vec<FeatureRow>,
    /// Everything else, in period order.
    pub prediction_only: Vec<FeatureRow>,
}

impl FeatureSet {
    /// Training and prediction-only rows merged back into period order.
    pub fn all_rows(&self) -> Vec<&FeatureRow> {
        let mut rows: Vec<&FeatureRow> = self.training.iter().chain(self.prediction_only.iter()).collect();
        rows.sort_by_key(|r| r.time_index);
        rows
    }
}

/// Build feature rows. Deterministic: the same series and config always yield
/// the same rows.
pub fn build_features(series: &ObservationSeries, config: &FeatureConfig) -> Result<FeatureSet> {
    let points = series.points();
    if config.lag_depth >= points.len() {
        return Err(ForecastError::data(
            ErrorContext::category(series.category()).with_range(series.range()),
            format!(
                "lag depth {} leaves no rows in a {}-month series",
                config.lag_depth,
                points.len()
            ),
        ));
    }

    let spec = FeatureSpec {
        lag_depth: config.lag_depth,
        seasonal: config.seasonal,
        trend_scale: (points.len().saturating_sub(1)).max(1) as f64,
    };

    let mut training = Vec::new();
    let mut prediction_only = Vec::new();

    for (i, point) in points.iter().enumerate() {
        let month = point.period.month();
        let lags: Vec<Option<f64>> = (1..=config.lag_depth)
            .map(|lag| if i >= lag { points[i - lag].actual } else { None })
            .collect();

        let row = FeatureRow {
            period: point.period,
            time_index: i,
            month,
            quarter: point.period.quarter(),
            month_sin: month_sin(month),
            month_cos: month_cos(month),
            lags,
            target: point.actual,
        };

        if row.target.is_some() && !row.has_null_lag() {
            training.push(row);
        } else {
            prediction_only.push(row);
        }
    }

    trace!(
        category = series.category(),
        training = training.len(),
        prediction_only = prediction_only.len(),
        "built feature rows"
    );

    Ok(FeatureSet {
        category: series.category().to_string(),
        spec,
        training,
        prediction_only,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ObservationRow;
    use crate::series::{IndexOptions, build_series};
    use chrono::NaiveDate;

    fn series(values: &[Option<f64>]) -> ObservationSeries {
        let rows: Vec<ObservationRow> = values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| {
                v.map(|actual| ObservationRow {
                    date: NaiveDate::from_ymd_opt(2023, 1, 1)
                        .unwrap()
                        .checked_add_months(chrono::Months::new(i as u32))
                        .unwrap(),
                    category: "Sales".to_string(),
                    actual_value: actual,
                    prior_forecast_value: None,
                })
            })
            .collect();
        build_series(
            "Sales",
            &rows,
            &IndexOptions {
                min_periods: 2,
                range: None,
            },
        )
        .unwrap()
    }

    fn cfg(lag_depth: usize) -> FeatureConfig {
        FeatureConfig {
            lag_depth,
            seasonal: true,
        }
    }

    #[test]
    fn first_k_rows_are_prediction_only() {
        let values: Vec<Option<f64>> = (0..12).map(|i| Some(i as f64)).collect();
        let set = build_features(&series(&values), &cfg(3)).unwrap();
        assert_eq!(set.prediction_only.len(), 3);
        assert_eq!(set.training.len(), 9);
        assert!(set.prediction_only.iter().all(|r| r.time_index < 3));

        let first = &set.training[0];
        assert_eq!(first.time_index, 3);
        assert_eq!(first.lags, vec![Some(2.0), Some(1.0), Some(0.0)]);
        assert_eq!(first.target, Some(3.0));
    }

    #[test]
    fn gaps_poison_their_row_and_downstream_lags() {
        let mut values: Vec<Option<f64>> = (0..12).map(|i| Some(i as f64)).collect();
        values[6] = None;
        let set = build_features(&series(&values), &cfg(1)).unwrap();
        // Row 0 (no lag), row 6 (no target), row 7 (lag_1 is the gap).
        let excluded: Vec<usize> = set.prediction_only.iter().map(|r| r.time_index).collect();
        assert_eq!(excluded, vec![0, 6, 7]);
        assert_eq!(set.all_rows().len(), 12);
    }

    #[test]
    fn calendar_fields_and_trend_scale() {
        let values: Vec<Option<f64>> = (0..13).map(|_| Some(1.0)).collect();
        let set = build_features(&series(&values), &cfg(0)).unwrap();
        assert_eq!(set.spec.trend_scale, 12.0);
        let dec = &set.training[11];
        assert_eq!((dec.month, dec.quarter), (12, 4));
        assert!(dec.month_sin.abs() < 1e-12);
        assert!((dec.month_cos - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_lag_depth_longer_than_series() {
        let values: Vec<Option<f64>> = (0..4).map(|_| Some(1.0)).collect();
        assert!(build_features(&series(&values), &cfg(4)).is_err());
    }
}
