//! Portable run report.
//!
//! The JSON written by `fcast forecast --export-report` and read back by
//! `fcast show`. It holds everything needed to reprint a run without the
//! input data: model, coefficients, accuracy, forecast and scenarios.

use serde::{Deserialize, Serialize};

use crate::domain::{
    AccuracyReport, EngineConfig, FittedModel, ForecastResult, ModelComparison, ModelKind, MonthPeriod, PeriodRange,
    ScenarioSummary,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub tool: String,
    pub version: String,
    pub config: EngineConfig,
    pub categories: Vec<CategoryReport>,
    #[serde(default)]
    pub failures: Vec<FailureReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub category: String,
    pub history: PeriodRange,
    pub observed_months: usize,
    #[serde(default)]
    pub missing_months: Vec<MonthPeriod>,
    pub model: FittedModel,
    pub candidates: Vec<CandidateSummary>,
    #[serde(default)]
    pub skipped: Vec<SkippedCandidate>,
    pub in_sample: AccuracyReport,
    pub comparison: Option<ModelComparison>,
    pub forecast: ForecastResult,
    pub scenarios: Vec<ScenarioSummary>,
    pub fitted: Vec<FittedValue>,
}

/// One fitted candidate, for the model comparison table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub kind: ModelKind,
    pub train_rows: usize,
    pub train_rmse: f64,
    pub selection_rmse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedCandidate {
    pub kind: ModelKind,
    pub reason: String,
}

/// Historical month with its actual and one-step fitted value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedValue {
    pub period: MonthPeriod,
    pub actual: Option<f64>,
    pub fitted: Option<f64>,
}

/// A category that could not be forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub category: String,
    /// `data`, `config` or `fit`.
    pub kind: String,
    pub message: String,
}
