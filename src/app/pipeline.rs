//! Shared forecasting pipeline used by the CLI commands and the tests.
//!
//! Per category: rows -> series -> features -> fit/select (through the model
//! store) -> in-sample + prior-method accuracy -> baseline -> scenarios.
//!
//! Categories are independent, so preparation, fitting and projection run in
//! parallel. A failing category is reported and never aborts the others.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::{
    AccuracyReport, CandidateSummary, CategoryReport, EngineConfig, FailureReport, FittedValue, ForecastReport,
    ForecastResult, ModelComparison, MonthPeriod, ObservationRow, ObservationSeries, ScenarioSummary, SkippedCandidate,
};
use crate::error::{ErrorContext, ForecastError, Result};
use crate::eval::{compare, in_sample_report, prior_method_report};
use crate::features::{FeatureConfig, FeatureSet, build_features};
use crate::fit::{FitConfig, FitSelection, ModelKey, ModelStore, fit_and_select, fitted_history};
use crate::forecast::{ForecastOptions, ForecastSeed, forecast};
use crate::scenario::compose;
use crate::series::{IndexOptions, build_series, group_by_category};

/// Everything computed for one category.
#[derive(Debug, Clone)]
pub struct CategoryRun {
    pub category: String,
    pub series: ObservationSeries,
    pub selection: Arc<FitSelection>,
    pub in_sample: AccuracyReport,
    /// Prior method vs. model on the in-sample window, when the data carries
    /// prior forecasts for every scored month.
    pub comparison: Option<ModelComparison>,
    /// Baseline plus scenario series.
    pub forecast: ForecastResult,
    pub scenario_summaries: Vec<ScenarioSummary>,
    pub fitted_history: Vec<(MonthPeriod, Option<f64>)>,
}

#[derive(Debug, Clone)]
pub struct CategoryFailure {
    pub category: String,
    pub error: ForecastError,
}

/// All computed outputs of a single `fcast forecast` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub config: EngineConfig,
    pub runs: Vec<CategoryRun>,
    pub failures: Vec<CategoryFailure>,
}

/// Series and features for one category, ready to fit.
struct Prepared {
    series: ObservationSeries,
    features: FeatureSet,
    key: ModelKey,
}

fn prepare(category: &str, rows: &[ObservationRow], config: &EngineConfig) -> Result<Prepared> {
    let series = build_series(category, rows, &IndexOptions::from(config))?;
    let features = build_features(&series, &FeatureConfig::from(config))?;
    let key = ModelKey::new(&series, config);
    Ok(Prepared { series, features, key })
}

fn finish(prepared: Prepared, selection: Arc<FitSelection>, config: &EngineConfig) -> Result<CategoryRun> {
    let Prepared { series, features, .. } = prepared;
    let model = &selection.best.model;

    let in_sample = in_sample_report(&selection.best, &features)?;
    let comparison = if series.points().iter().any(|p| p.prior_forecast.is_some()) {
        match prior_method_report(&series, in_sample.window).and_then(|prior| compare(&prior, &in_sample)) {
            Ok(cmp) => Some(cmp),
            Err(err) => {
                warn!(category = series.category(), error = %err, "prior-method comparison skipped");
                None
            }
        }
    } else {
        None
    };

    let seed = ForecastSeed::from_series(&series, model.feature_spec.lag_depth)?;
    let baseline = forecast(
        model,
        &seed,
        &ForecastOptions {
            horizon: config.horizon_months,
            non_negative: config.non_negative,
        },
    )?;
    let composed = compose(&baseline, &config.scenarios)?;
    let history = fitted_history(model, &features);

    info!(
        category = series.category(),
        model = %model.kind.display_name(),
        mape = in_sample.mape,
        rmse = in_sample.rmse,
        horizon = %composed.result.horizon(),
        "category forecast ready"
    );

    Ok(CategoryRun {
        category: series.category().to_string(),
        series,
        selection,
        in_sample,
        comparison,
        forecast: composed.result,
        scenario_summaries: composed.summaries,
        fitted_history: history,
    })
}

/// Run the full pipeline for one category.
pub fn run_category(
    category: &str,
    rows: &[ObservationRow],
    config: &EngineConfig,
    store: &mut ModelStore,
) -> Result<CategoryRun> {
    config.validate()?;
    let prepared = prepare(category, rows, config)?;
    let selection = store.get_or_fit(prepared.key.clone(), || {
        fit_and_select(&prepared.features, &FitConfig::from(config))
    })?;
    finish(prepared, selection, config)
}

/// Run every category found in `rows`.
///
/// Fails only on an invalid config or an empty input; per-category problems
/// land in `RunOutput::failures`.
pub fn run_all(rows: &[ObservationRow], config: &EngineConfig, store: &mut ModelStore) -> Result<RunOutput> {
    config.validate()?;
    let groups = group_by_category(rows);
    if groups.is_empty() {
        return Err(ForecastError::data(ErrorContext::default(), "no observation rows supplied"));
    }

    let mut failures = Vec::new();
    let prepared: Vec<(String, Result<Prepared>)> = groups
        .par_iter()
        .map(|(category, rows)| (category.clone(), prepare(category, rows, config)))
        .collect();

    // Store lookups happen on this thread; only misses are fitted.
    let mut staged = Vec::new();
    for (category, result) in prepared {
        match result {
            Ok(p) => {
                let cached = store.get(&p.key);
                staged.push((category, p, cached));
            }
            Err(error) => failures.push(CategoryFailure { category, error }),
        }
    }

    let fit_config = FitConfig::from(config);
    let fitted: Vec<(String, Prepared, Result<(Arc<FitSelection>, bool)>)> = staged
        .into_par_iter()
        .map(|(category, p, cached)| {
            let selection = match cached {
                Some(hit) => Ok((hit, false)),
                None => fit_and_select(&p.features, &fit_config).map(|s| (Arc::new(s), true)),
            };
            (category, p, selection)
        })
        .collect();

    let mut ready = Vec::new();
    for (category, p, selection) in fitted {
        match selection {
            Ok((selection, fresh)) => {
                if fresh {
                    store.insert(p.key.clone(), Arc::clone(&selection));
                }
                ready.push((category, p, selection));
            }
            Err(error) => failures.push(CategoryFailure { category, error }),
        }
    }

    let finished: Vec<(String, Result<CategoryRun>)> = ready
        .into_par_iter()
        .map(|(category, p, selection)| (category, finish(p, selection, config)))
        .collect();

    let mut runs = Vec::new();
    for (category, result) in finished {
        match result {
            Ok(run) => runs.push(run),
            Err(error) => failures.push(CategoryFailure { category, error }),
        }
    }

    for failure in &failures {
        warn!(category = %failure.category, error = %failure.error, "category failed");
    }
    failures.sort_by(|a, b| a.category.cmp(&b.category));

    Ok(RunOutput {
        config: config.clone(),
        runs,
        failures,
    })
}

impl CategoryRun {
    pub fn to_report(&self) -> CategoryReport {
        let candidates = self
            .selection
            .fits
            .iter()
            .map(|f| CandidateSummary {
                kind: f.model.kind,
                train_rows: f.train_rows,
                train_rmse: f.train_rmse,
                selection_rmse: f.selection_rmse,
            })
            .collect();
        let skipped = self
            .selection
            .skipped
            .iter()
            .map(|(kind, err)| SkippedCandidate {
                kind: *kind,
                reason: err.to_string(),
            })
            .collect();
        let fitted = self
            .series
            .points()
            .iter()
            .zip(&self.fitted_history)
            .map(|(point, (period, fitted))| FittedValue {
                period: *period,
                actual: point.actual,
                fitted: *fitted,
            })
            .collect();

        CategoryReport {
            category: self.category.clone(),
            history: self.series.range(),
            observed_months: self.series.observed_count(),
            missing_months: self.series.missing_periods(),
            model: self.selection.best.model.clone(),
            candidates,
            skipped,
            in_sample: self.in_sample.clone(),
            comparison: self.comparison.clone(),
            forecast: self.forecast.clone(),
            scenarios: self.scenario_summaries.clone(),
            fitted,
        }
    }
}

impl RunOutput {
    /// Portable report for JSON export and printing.
    pub fn to_report(&self) -> ForecastReport {
        ForecastReport {
            tool: "fcast".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config: self.config.clone(),
            categories: self.runs.iter().map(CategoryRun::to_report).collect(),
            failures: self
                .failures
                .iter()
                .map(|f| FailureReport {
                    category: f.category.clone(),
                    kind: format!("{:?}", f.error.kind()).to_lowercase(),
                    message: f.error.to_string(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::monthly_rows;

    fn rows() -> Vec<ObservationRow> {
        let sales: Vec<f64> = (0..36)
            .map(|i| 1000.0 + 12.0 * i as f64 + 60.0 * ((i % 12) as f64 - 5.5).abs() + (i * 7 % 5) as f64)
            .collect();
        let priors: Vec<f64> = sales.iter().map(|v| v * 1.1).collect();
        let mut rows = monthly_rows("sales", &sales, Some(&priors));
        rows.extend(monthly_rows("Expenses", &vec![500.0; 6], None));
        rows
    }

    #[test]
    fn short_category_fails_without_aborting_others() {
        let mut store = ModelStore::new();
        let out = run_all(&rows(), &EngineConfig::default(), &mut store).unwrap();
        assert_eq!(out.runs.len(), 1);
        assert_eq!(out.runs[0].category, "Sales");
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].category, "Expenses");
        assert!(matches!(out.failures[0].error, ForecastError::Data { .. }));

        let run = &out.runs[0];
        assert_eq!(run.forecast.baseline.len(), 6);
        assert_eq!(run.forecast.scenarios.len(), 2);
        assert_eq!(run.fitted_history.len(), 36);
        let cmp = run.comparison.as_ref().unwrap();
        assert!((cmp.prior.mape - 10.0).abs() < 1e-6);
    }

    #[test]
    fn second_run_reuses_the_store() {
        let mut store = ModelStore::new();
        let config = EngineConfig::default();
        let first = run_all(&rows(), &config, &mut store).unwrap();
        assert_eq!(store.len(), 1);
        let second = run_all(&rows(), &config, &mut store).unwrap();
        assert_eq!(store.len(), 1);
        assert!(Arc::ptr_eq(&first.runs[0].selection, &second.runs[0].selection));
    }

    #[test]
    fn invalid_config_fails_fast() {
        let config = EngineConfig {
            horizon_months: 30,
            ..EngineConfig::default()
        };
        let err = run_all(&rows(), &config, &mut ModelStore::new()).unwrap_err();
        assert!(matches!(err, ForecastError::Config { .. }));
    }

    #[test]
    fn single_category_matches_run_all() {
        let config = EngineConfig::default();
        let all = run_all(&rows(), &config, &mut ModelStore::new()).unwrap();
        let sales: Vec<ObservationRow> = rows().into_iter().filter(|r| r.category == "sales").collect();
        let one = run_category("Sales", &sales, &config, &mut ModelStore::new()).unwrap();
        assert_eq!(one.forecast, all.runs[0].forecast);

        let report = all.to_report();
        assert_eq!(report.categories[0].fitted.len(), 36);
        assert_eq!(report.failures[0].kind, "data");
    }

    #[test]
    fn range_past_the_data_still_forecasts() {
        let config = EngineConfig {
            requested_range: Some(crate::domain::PeriodRange::new(
                MonthPeriod::new(2022, 1).unwrap(),
                MonthPeriod::new(2025, 3).unwrap(),
            )),
            ..EngineConfig::default()
        };
        let sales: Vec<ObservationRow> = rows().into_iter().filter(|r| r.category == "sales").collect();
        let run = run_category("Sales", &sales, &config, &mut ModelStore::new()).unwrap();

        assert_eq!(run.series.missing_periods().len(), 3);
        assert_eq!(run.forecast.horizon_start.to_string(), "2025-01");
        assert_eq!(run.forecast.baseline.len(), 6);
    }

    #[test]
    fn oversized_lag_is_a_config_error() {
        let config = EngineConfig {
            lag_depth: 40,
            ..EngineConfig::default()
        };
        let err = run_all(&rows(), &config, &mut ModelStore::new()).unwrap_err();
        assert!(matches!(err, ForecastError::Config { parameter: "lag_depth", .. }));
    }
}
