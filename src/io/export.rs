//! CSV exports.
//!
//! - the forecast in long format (`category,period,series,value`), easy to
//!   pivot in a spreadsheet or load into a dataframe
//! - raw observation rows, used by `fcast sample`

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{BASELINE_SCENARIO, ForecastReport, MonthPeriod, ObservationRow};
use crate::error::AppError;

/// Series labels used in the long-format export besides scenario names.
pub const SERIES_ACTUAL: &str = "actual";
pub const SERIES_FITTED: &str = "fitted";

#[derive(Debug, Serialize)]
struct LongRow<'a> {
    category: &'a str,
    period: MonthPeriod,
    series: &'a str,
    value: f64,
}

#[derive(Debug, Serialize)]
struct ObservationRecord<'a> {
    date: String,
    category: &'a str,
    scenario: &'a str,
    actual_value: f64,
    prior_forecast_value: Option<f64>,
}

/// Write history, fitted values, baseline and scenarios for every category.
pub fn write_forecast_csv(path: &Path, report: &ForecastReport) -> Result<(), AppError> {
    let file = std::fs::File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_forecast_rows(file, report)
}

pub fn write_forecast_rows<W: Write>(out: W, report: &ForecastReport) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    let mut emit = |category: &str, period: MonthPeriod, series: &str, value: f64| {
        writer
            .serialize(LongRow {
                category,
                period,
                series,
                value,
            })
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))
    };

    for cat in &report.categories {
        let name = cat.category.as_str();
        for f in &cat.fitted {
            if let Some(v) = f.actual {
                emit(name, f.period, SERIES_ACTUAL, v)?;
            }
            if let Some(v) = f.fitted {
                emit(name, f.period, SERIES_FITTED, v)?;
            }
        }
        for p in &cat.forecast.baseline {
            emit(name, p.period, BASELINE_SCENARIO, p.value)?;
        }
        for (scenario, points) in &cat.forecast.scenarios {
            for p in points {
                emit(name, p.period, scenario, p.value)?;
            }
        }
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}

/// Write observation rows in the ingest schema.
pub fn write_observations_csv(path: &Path, rows: &[ObservationRow], scenario: &str) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
    for row in rows {
        writer
            .serialize(ObservationRecord {
                date: row.date.format("%Y-%m-%d").to_string(),
                category: &row.category,
                scenario,
                actual_value: row.actual_value,
                prior_forecast_value: row.prior_forecast_value,
            })
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))
}
