//! CSV ingest and normalization.
//!
//! Turns a monthly actuals CSV into `ObservationRow`s ready for the time
//! index builder.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (input order is preserved)
//! - **No forecasting logic here**

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::debug;

use crate::domain::ObservationRow;
use crate::error::AppError;
use crate::series::normalize_category;

const ACTUAL_COLUMNS: [&str; 3] = ["actual_value", "actual", "actual_sales"];
const PRIOR_COLUMNS: [&str; 4] = ["prior_forecast_value", "prior_forecast", "forecast", "forecast_sales"];

/// Row filters applied during ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestFilter {
    /// Keep only this category (compared after normalization).
    pub category: Option<String>,
    /// Keep only rows whose `scenario` column matches (case-insensitive).
    pub scenario: Option<String>,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub category: Option<String>,
    pub message: String,
}

/// Ingest output: rows + row errors + counts.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub rows: Vec<ObservationRow>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load observation rows from a CSV file.
pub fn load_observations(path: &Path, filter: &IngestFilter) -> Result<IngestedData, AppError> {
    let file = File::open(path).map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_observations(file, filter)
}

/// Parse observation rows from any CSV reader.
pub fn read_observations<R: Read>(reader: R, filter: &IngestFilter) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let columns = resolve_columns(&headers, filter)?;

    let wanted_category = filter.category.as_deref().map(normalize_category);
    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    category: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        if let (Some(want), Some(col)) = (filter.scenario.as_deref(), columns.scenario) {
            let value = field(&record, col).unwrap_or("");
            if !value.eq_ignore_ascii_case(want.trim()) {
                continue;
            }
        }

        match parse_row(&record, &columns) {
            Ok(row) => {
                if wanted_category.as_deref().is_some_and(|c| normalize_category(&row.category) != c) {
                    continue;
                }
                rows.push(row);
            }
            Err(message) => row_errors.push(RowError {
                line,
                category: field(&record, columns.category).map(normalize_category),
                message,
            }),
        }
    }

    let rows_used = rows.len();
    debug!(rows_read, rows_used, row_errors = row_errors.len(), "ingested CSV");
    if rows_used == 0 {
        return Err(AppError::new(3, "No valid rows remain after parsing/filtering."));
    }

    Ok(IngestedData {
        rows,
        row_errors,
        rows_read,
        rows_used,
    })
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    category: usize,
    actual: usize,
    prior: Option<usize>,
    scenario: Option<usize>,
}

fn resolve_columns(headers: &StringRecord, filter: &IngestFilter) -> Result<Columns, AppError> {
    let header_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect();
    let first_of = |names: &[&str]| names.iter().find_map(|n| header_map.get(*n).copied());

    let date = first_of(&["date"]).ok_or_else(|| AppError::new(2, "Missing required column: `date`"))?;
    let actual = first_of(&ACTUAL_COLUMNS).ok_or_else(|| {
        AppError::new(
            2,
            format!("Missing required column: one of `{}`", ACTUAL_COLUMNS.join("`, `")),
        )
    })?;
    let category = first_of(&["category"]).ok_or_else(|| AppError::new(2, "Missing required column: `category`"))?;
    let scenario = first_of(&["scenario"]);
    if filter.scenario.is_some() && scenario.is_none() {
        return Err(AppError::new(
            2,
            "Filter `--input-scenario` requires a `scenario` column in the CSV.",
        ));
    }

    Ok(Columns {
        date,
        category,
        actual,
        prior: first_of(&PRIOR_COLUMNS),
        scenario,
    })
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often carry a BOM on the first header.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn parse_row(record: &StringRecord, columns: &Columns) -> Result<ObservationRow, String> {
    let date = parse_date(field(record, columns.date).ok_or("Missing required value: `date`")?)?;
    let category = field(record, columns.category)
        .ok_or("Missing required value: `category`")?
        .to_string();
    let actual_value = parse_f64(field(record, columns.actual).ok_or("Missing required value: actual")?)?;
    let prior_forecast_value = match columns.prior.and_then(|c| field(record, c)) {
        Some(raw) => Some(parse_f64(raw)?),
        None => None,
    };

    Ok(ObservationRow {
        date,
        category,
        actual_value,
        prior_forecast_value,
    })
}

fn field(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    // Month-only form, e.g. `2024-03`.
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
        return Ok(d);
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY-MM, MM/DD/YYYY, YYYY/MM/DD."
    ))
}

fn parse_f64(s: &str) -> Result<f64, String> {
    // Thousands separators and a leading currency sign are common in finance exports.
    let cleaned: String = s.chars().filter(|c| *c != ',' && *c != '$').collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("Invalid number '{s}'.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingest(csv: &str, filter: &IngestFilter) -> Result<IngestedData, AppError> {
        read_observations(csv.as_bytes(), filter)
    }

    #[test]
    fn aliases_and_date_formats() {
        let csv = "\u{feff}Date,Category,Actual_Sales,Forecast_Sales\n\
                   2024-01-15,sales,100,110\n\
                   2024-02,SALES,\"1,200\",\n\
                   03/01/2024,Sales,$90.5,95\n";
        let data = ingest(csv, &IngestFilter::default()).unwrap();
        assert_eq!(data.rows_used, 3);
        assert!(data.row_errors.is_empty());
        assert_eq!(data.rows[0].prior_forecast_value, Some(110.0));
        assert_eq!(data.rows[1].actual_value, 1200.0);
        assert_eq!(data.rows[1].prior_forecast_value, None);
        assert_eq!(data.rows[2].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(data.rows[2].actual_value, 90.5);
    }

    #[test]
    fn bad_rows_are_reported_not_fatal() {
        let csv = "date,category,actual_value\n\
                   2024-01-01,Sales,100\n\
                   not-a-date,Sales,100\n\
                   2024-03-01,Expenses,abc\n";
        let data = ingest(csv, &IngestFilter::default()).unwrap();
        assert_eq!((data.rows_read, data.rows_used), (3, 1));
        assert_eq!(data.row_errors.len(), 2);
        assert_eq!(data.row_errors[0].line, 3);
        assert_eq!(data.row_errors[1].category.as_deref(), Some("Expenses"));
    }

    #[test]
    fn filters_by_category_and_scenario() {
        let csv = "date,category,scenario,actual_value\n\
                   2024-01-01,Sales,Baseline,1\n\
                   2024-01-01,Sales,Budget,2\n\
                   2024-01-01,Expenses,baseline,3\n";
        let filter = IngestFilter {
            category: Some("sales".to_string()),
            scenario: Some("baseline".to_string()),
        };
        let data = ingest(csv, &filter).unwrap();
        assert_eq!(data.rows.len(), 1);
        assert_eq!(data.rows[0].actual_value, 1.0);
    }

    #[test]
    fn schema_errors_use_exit_code_2() {
        let err = ingest("date,category\n2024-01-01,Sales\n", &IngestFilter::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let filter = IngestFilter {
            scenario: Some("Baseline".to_string()),
            ..IngestFilter::default()
        };
        let err = ingest("date,category,actual\n2024-01-01,Sales,1\n", &filter).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn nothing_usable_is_exit_code_3() {
        let err = ingest("date,category,actual\nbad,Sales,1\n", &IngestFilter::default()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
