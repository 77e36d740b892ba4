//! Fixtures shared by unit tests.

use chrono::{Months, NaiveDate};

use crate::domain::{ObservationRow, ObservationSeries};
use crate::features::{FeatureConfig, FeatureSet, build_features};
use crate::series::{IndexOptions, build_series};

/// Consecutive monthly rows starting January 2022.
pub fn monthly_rows(category: &str, values: &[f64], priors: Option<&[f64]>) -> Vec<ObservationRow> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| ObservationRow {
            date: start.checked_add_months(Months::new(i as u32)).unwrap(),
            category: category.to_string(),
            actual_value: v,
            prior_forecast_value: priors.map(|p| p[i]),
        })
        .collect()
}

pub fn series(values: &[f64]) -> ObservationSeries {
    build_series(
        "Sales",
        &monthly_rows("Sales", values, None),
        &IndexOptions {
            min_periods: 2,
            range: None,
        },
    )
    .unwrap()
}

pub fn feature_set(values: &[f64], lag_depth: usize, seasonal: bool) -> FeatureSet {
    build_features(&series(values), &FeatureConfig { lag_depth, seasonal }).unwrap()
}
