//! Read/write the JSON run report.
//!
//! The schema is defined by `domain::ForecastReport`.

use std::fs::File;
use std::path::Path;

use crate::domain::ForecastReport;
use crate::error::AppError;

/// Write a report JSON file.
pub fn write_report_json(path: &Path, report: &ForecastReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report).map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))
}

/// Read a report JSON file.
pub fn read_report_json(path: &Path) -> Result<ForecastReport, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open report JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid report JSON: {e}")))
}
