//! Time index builder.
//!
//! Turns raw, possibly unordered rows for one category into an
//! `ObservationSeries` on a contiguous monthly grid:
//!
//! - rows are bucketed by calendar month (the day of month is discarded)
//! - identical duplicates collapse; conflicting duplicates are a data error
//! - months inside the range with no row are inserted as missing
//! - a range shorter than `min_periods` months is rejected

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{EngineConfig, MonthPeriod, ObservationRow, ObservationSeries, PeriodRange, SeriesPoint};
use crate::error::{ErrorContext, ForecastError, Result};

/// Options for reindexing a single series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexOptions {
    pub min_periods: usize,
    /// Explicit grid to reindex onto; defaults to the observed span.
    pub range: Option<PeriodRange>,
}

impl From<&EngineConfig> for IndexOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            min_periods: config.min_periods,
            range: config.requested_range,
        }
    }
}

/// Canonical category label: trimmed, single-spaced, title-cased.
pub fn normalize_category(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Split rows by normalized category. Keys come back sorted.
pub fn group_by_category(rows: &[ObservationRow]) -> BTreeMap<String, Vec<ObservationRow>> {
    let mut groups: BTreeMap<String, Vec<ObservationRow>> = BTreeMap::new();
    for row in rows {
        let category = normalize_category(&row.category);
        groups.entry(category.clone()).or_default().push(ObservationRow {
            category,
            ..row.clone()
        });
    }
    groups
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MonthValues {
    actual: f64,
    prior: Option<f64>,
}

/// Build the reindexed series for `category` from `rows`.
pub fn build_series(category: &str, rows: &[ObservationRow], opts: &IndexOptions) -> Result<ObservationSeries> {
    let category = normalize_category(category);
    let ctx = || ErrorContext::category(category.clone());

    if rows.is_empty() {
        return Err(ForecastError::data(ctx(), "no observations supplied"));
    }

    let mut by_month: BTreeMap<MonthPeriod, MonthValues> = BTreeMap::new();
    for row in rows {
        if normalize_category(&row.category) != category {
            return Err(ForecastError::data(
                ctx(),
                format!("row for category '{}' passed to this series", row.category),
            ));
        }

        let period = MonthPeriod::from_date(row.date);
        if !row.actual_value.is_finite() {
            return Err(ForecastError::data(
                ctx(),
                format!("non-finite actual value at {period}"),
            ));
        }
        if row.prior_forecast_value.is_some_and(|v| !v.is_finite()) {
            return Err(ForecastError::data(
                ctx(),
                format!("non-finite prior forecast value at {period}"),
            ));
        }

        let values = MonthValues {
            actual: row.actual_value,
            prior: row.prior_forecast_value,
        };
        match by_month.get(&period) {
            Some(existing) if *existing == values => {}
            Some(existing) => {
                return Err(ForecastError::data(
                    ctx().with_range(PeriodRange::new(period, period)),
                    format!(
                        "conflicting duplicate rows for {period}: actual {} vs {}",
                        existing.actual, values.actual
                    ),
                ));
            }
            None => {
                by_month.insert(period, values);
            }
        }
    }

    let observed = match (by_month.keys().next(), by_month.keys().next_back()) {
        (Some(&first), Some(&last)) => PeriodRange::new(first, last),
        _ => return Err(ForecastError::data(ctx(), "no observations supplied")),
    };
    let range = opts.range.unwrap_or(observed);

    let outside = by_month.keys().filter(|p| !range.contains(**p)).count();
    if outside > 0 {
        debug!(category = %category, %range, dropped = outside, "dropping rows outside requested range");
    }

    if range.len() < opts.min_periods {
        return Err(ForecastError::data(
            ctx().with_range(range),
            format!(
                "range spans {} months, need at least {}",
                range.len(),
                opts.min_periods
            ),
        ));
    }

    let points: Vec<SeriesPoint> = range
        .iter()
        .map(|period| match by_month.get(&period) {
            Some(v) => SeriesPoint {
                period,
                actual: Some(v.actual),
                prior_forecast: v.prior,
            },
            None => SeriesPoint {
                period,
                actual: None,
                prior_forecast: None,
            },
        })
        .collect();

    let missing = points.iter().filter(|p| p.is_missing()).count();
    if missing == points.len() {
        return Err(ForecastError::data(
            ctx().with_range(range),
            "no observations fall inside the requested range",
        ));
    }
    if missing > 0 {
        debug!(category = %category, %range, missing, "inserted missing months");
    }

    Ok(ObservationSeries::from_points(category, points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(category: &str, y: i32, m: u32, actual: f64) -> ObservationRow {
        ObservationRow {
            date: NaiveDate::from_ymd_opt(y, m, 15).unwrap(),
            category: category.to_string(),
            actual_value: actual,
            prior_forecast_value: None,
        }
    }

    fn opts(min_periods: usize) -> IndexOptions {
        IndexOptions {
            min_periods,
            range: None,
        }
    }

    #[test]
    fn sorts_and_fills_gaps() {
        let rows = vec![
            row("Sales", 2024, 3, 30.0),
            row("Sales", 2024, 1, 10.0),
            row("Sales", 2024, 5, 50.0),
        ];
        let series = build_series("Sales", &rows, &opts(3)).unwrap();
        let periods: Vec<String> = series.points().iter().map(|p| p.period.to_string()).collect();
        assert_eq!(periods, ["2024-01", "2024-02", "2024-03", "2024-04", "2024-05"]);
        assert_eq!(series.observed_count(), 3);
        assert_eq!(series.missing_periods().len(), 2);
        assert_eq!(series.points()[2].actual, Some(30.0));
    }

    #[test]
    fn rejects_short_ranges() {
        let rows: Vec<_> = (1..=6).map(|m| row("Sales", 2024, m, 1.0)).collect();
        let err = build_series("Sales", &rows, &opts(12)).unwrap_err();
        assert!(matches!(err, ForecastError::Data { .. }));
        assert!(err.to_string().contains("need at least 12"));
    }

    #[test]
    fn identical_duplicates_merge_conflicting_fail() {
        let mut rows: Vec<_> = (1..=12).map(|m| row("Sales", 2024, m, m as f64)).collect();
        rows.push(row("Sales", 2024, 4, 4.0));
        assert_eq!(build_series("Sales", &rows, &opts(12)).unwrap().len(), 12);

        rows.push(row("Sales", 2024, 4, 99.0));
        let err = build_series("Sales", &rows, &opts(12)).unwrap_err();
        assert!(err.to_string().contains("2024-04"));
    }

    #[test]
    fn requested_range_extends_and_trims() {
        let rows: Vec<_> = (1..=12).map(|m| row("Sales", 2024, m, 1.0)).collect();
        let range = PeriodRange::new(MonthPeriod::new(2024, 6).unwrap(), MonthPeriod::new(2025, 5).unwrap());
        let series = build_series(
            "Sales",
            &rows,
            &IndexOptions {
                min_periods: 12,
                range: Some(range),
            },
        )
        .unwrap();
        assert_eq!(series.range(), range);
        assert_eq!(series.observed_count(), 7);
    }

    #[test]
    fn categories_are_normalized() {
        assert_eq!(normalize_category("  customer   SUPPORT "), "Customer Support");
        let rows = vec![row(" sales", 2024, 1, 1.0), row("SALES", 2024, 2, 2.0), row("Expenses", 2024, 1, 3.0)];
        let groups = group_by_category(&rows);
        assert_eq!(groups.keys().cloned().collect::<Vec<_>>(), ["Expenses", "Sales"]);
        assert_eq!(groups["Sales"].len(), 2);
    }
}
