//! Shared domain types.
//!
//! Every stage of the pipeline produces new values from its inputs; nothing
//! here is mutated after construction. The types are serializable so they can
//! be exported to JSON and reloaded later by `fcast show`.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::{MonthPeriod, PeriodRange};

/// A raw input row as handed over by the data-loading collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRow {
    pub date: NaiveDate,
    pub category: String,
    pub actual_value: f64,
    pub prior_forecast_value: Option<f64>,
}

/// One month of a reindexed series.
///
/// `actual` is `None` for months inserted by the time index builder to close
/// a gap; such months are kept for display but never trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub period: MonthPeriod,
    pub actual: Option<f64>,
    pub prior_forecast: Option<f64>,
}

impl SeriesPoint {
    pub fn is_missing(&self) -> bool {
        self.actual.is_none()
    }
}

/// A single category's history on a contiguous monthly grid.
///
/// Invariants (established by `series::build_series`):
/// - periods strictly increasing, no duplicates
/// - no gaps between the first and last period
/// - at least one observed (non-missing) value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSeries {
    category: String,
    points: Vec<SeriesPoint>,
}

impl ObservationSeries {
    /// Callers outside `series` go through the builder, which checks the invariants.
    pub(crate) fn from_points(category: String, points: Vec<SeriesPoint>) -> Self {
        debug_assert!(!points.is_empty());
        debug_assert!(points.windows(2).all(|w| w[0].period.succ() == w[1].period));
        Self { category, points }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First and last period of the grid.
    pub fn range(&self) -> PeriodRange {
        let first = self.points.first().map(|p| p.period);
        let last = self.points.last().map(|p| p.period);
        match (first, last) {
            (Some(a), Some(b)) => PeriodRange::new(a, b),
            // `from_points` never receives an empty vector.
            _ => unreachable!("ObservationSeries is never empty"),
        }
    }

    pub fn observed_count(&self) -> usize {
        self.points.iter().filter(|p| !p.is_missing()).count()
    }

    pub fn missing_periods(&self) -> Vec<MonthPeriod> {
        self.points
            .iter()
            .filter(|p| p.is_missing())
            .map(|p| p.period)
            .collect()
    }

    /// Stable content hash over periods and values (used as a cache key part).
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.category.hash(&mut hasher);
        for p in &self.points {
            p.period.hash(&mut hasher);
            p.actual.map(f64::to_bits).hash(&mut hasher);
            p.prior_forecast.map(f64::to_bits).hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// Feature layout shared by every model fitted on one feature set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Number of lagged target values (`lag_1..lag_k`).
    pub lag_depth: usize,
    /// Whether the sine/cosine month-of-year encoding is included.
    pub seasonal: bool,
    /// Divisor applied to `time_index` before it enters the design matrix.
    pub trend_scale: f64,
}

/// One engineered row. Owned by the feature engineer, read-only downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub period: MonthPeriod,
    pub time_index: usize,
    pub month: u32,
    pub quarter: u32,
    pub month_sin: f64,
    pub month_cos: f64,
    /// `lags[i]` is `lag_(i+1)`; `None` when that month is before the series
    /// start or was a gap.
    pub lags: Vec<Option<f64>>,
    pub target: Option<f64>,
}

impl FeatureRow {
    /// All lag values, or `None` if any is unknown.
    pub fn complete_lags(&self) -> Option<Vec<f64>> {
        self.lags.iter().copied().collect()
    }

    pub fn has_null_lag(&self) -> bool {
        self.lags.iter().any(Option::is_none)
    }
}

/// A single column of the design matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "term", rename_all = "snake_case")]
pub enum Term {
    Intercept,
    /// `(time_index / trend_scale)^power`.
    Trend { power: u8 },
    MonthSin,
    MonthCos,
    /// `lag_n` of the target.
    Lag { n: usize },
}

/// Concrete model family. The candidate set is small and closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelKind {
    Linear,
    Polynomial { degree: u8 },
}

impl ModelKind {
    /// Degree of the trend polynomial (linear is degree 1).
    pub fn degree(self) -> u8 {
        match self {
            ModelKind::Linear => 1,
            ModelKind::Polynomial { degree } => degree,
        }
    }

    pub fn display_name(self) -> String {
        match self {
            ModelKind::Linear => "linear".to_string(),
            ModelKind::Polynomial { degree } => format!("poly(deg={degree})"),
        }
    }

    /// Ordering used to break ties: lower degree first, linear before an
    /// equivalent degree-1 polynomial.
    pub fn complexity_rank(self) -> (u8, u8) {
        match self {
            ModelKind::Linear => (1, 0),
            ModelKind::Polynomial { degree } => (degree, 1),
        }
    }

    /// Design-matrix columns, in order, for this kind on `spec`.
    pub fn terms(self, spec: &FeatureSpec) -> Vec<Term> {
        let mut terms = vec![Term::Intercept];
        for power in 1..=self.degree() {
            terms.push(Term::Trend { power });
        }
        if spec.seasonal {
            terms.push(Term::MonthSin);
            terms.push(Term::MonthCos);
        }
        for n in 1..=spec.lag_depth {
            terms.push(Term::Lag { n });
        }
        terms
    }
}

/// Which model(s) to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelSpec {
    /// Compare linear and every polynomial degree up to `polynomial_degree`.
    Auto,
    Linear,
    /// A single polynomial of `polynomial_degree`.
    Polynomial,
}

impl ModelSpec {
    pub fn candidates(self, polynomial_degree: u8) -> Vec<ModelKind> {
        match self {
            ModelSpec::Linear => vec![ModelKind::Linear],
            ModelSpec::Polynomial => vec![ModelKind::Polynomial {
                degree: polynomial_degree,
            }],
            ModelSpec::Auto => {
                let mut out = vec![ModelKind::Linear];
                out.extend((2..=polynomial_degree).map(|degree| ModelKind::Polynomial { degree }));
                out
            }
        }
    }
}

/// A fitted regression. Immutable; a refit always yields a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub category: String,
    pub kind: ModelKind,
    /// One coefficient per entry of `terms`, same order.
    pub coefficients: Vec<f64>,
    pub terms: Vec<Term>,
    pub feature_spec: FeatureSpec,
    pub train_window: PeriodRange,
}

/// A single forecast value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub period: MonthPeriod,
    pub value: f64,
}

/// Baseline projection plus any derived scenarios for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub category: String,
    pub horizon_start: MonthPeriod,
    pub horizon_end: MonthPeriod,
    pub baseline: Vec<ForecastPoint>,
    pub scenarios: BTreeMap<String, Vec<ForecastPoint>>,
}

impl ForecastResult {
    pub fn horizon(&self) -> PeriodRange {
        PeriodRange::new(self.horizon_start, self.horizon_end)
    }

    pub fn baseline_values(&self) -> Vec<f64> {
        self.baseline.iter().map(|p| p.value).collect()
    }
}

/// What the predictions were scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonBasis {
    /// A forecast column produced by the legacy method.
    PriorMethod,
    /// The model's own predictions on held-out rows.
    InSample,
}

impl ComparisonBasis {
    pub fn label(self) -> &'static str {
        match self {
            ComparisonBasis::PriorMethod => "prior_method",
            ComparisonBasis::InSample => "in_sample",
        }
    }
}

/// Per-period actual vs. predicted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodVariance {
    pub period: MonthPeriod,
    pub actual: f64,
    pub predicted: f64,
    /// `(actual - predicted) / actual * 100`; `None` when `actual == 0`.
    pub variance_pct: Option<f64>,
}

/// Error metrics for one (model, window, basis) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    /// Mean absolute percentage error, in percent.
    pub mape: f64,
    pub rmse: f64,
    /// Mean of the per-period variance %.
    pub variance_pct: f64,
    /// Coefficient of determination; `None` when actuals have zero variance.
    pub r_squared: Option<f64>,
    pub sample_size: usize,
    /// Rows left out of MAPE / variance % because the actual was zero.
    pub zero_actual_excluded: usize,
    pub compared_against: ComparisonBasis,
    pub window: PeriodRange,
    pub per_period: Vec<PeriodVariance>,
}

/// Prior method vs. new model on one shared window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    pub prior: AccuracyReport,
    pub model: AccuracyReport,
    /// `(prior_MAPE - new_MAPE) / prior_MAPE * 100`.
    pub improvement_pct: f64,
}

/// How scenario rates are applied to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioMode {
    /// `baseline_t * (1 + rate)^(t + 1)`: divergence grows with the horizon.
    Multiplicative,
    /// `baseline_t * (1 + rate)`: a flat percentage shift.
    Additive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAdjustment {
    pub name: String,
    pub rate: f64,
}

impl ScenarioAdjustment {
    pub fn new(name: impl Into<String>, rate: f64) -> Self {
        Self {
            name: name.into(),
            rate,
        }
    }
}

/// Declared scenarios for one request.
///
/// A list rather than a map so that duplicate names are detected instead of
/// silently collapsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub mode: ScenarioMode,
    pub adjustments: Vec<ScenarioAdjustment>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            mode: ScenarioMode::Multiplicative,
            adjustments: vec![
                ScenarioAdjustment::new("optimistic", 0.05),
                ScenarioAdjustment::new("pessimistic", -0.05),
            ],
        }
    }
}

/// Scenario vs. baseline at one horizon period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDelta {
    pub period: MonthPeriod,
    pub baseline: f64,
    pub value: f64,
    pub delta: f64,
    /// `delta / baseline * 100`; `None` when the baseline is zero.
    pub delta_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub name: String,
    pub rate: f64,
    pub mode: ScenarioMode,
    pub midpoint: ScenarioDelta,
    pub endpoint: ScenarioDelta,
    /// Sum of per-period deltas across the horizon.
    pub cumulative_delta: f64,
}
