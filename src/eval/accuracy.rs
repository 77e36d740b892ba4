//! Error metrics between predictions and actuals.
//!
//! Two bases are supported:
//! - in-sample: the model's one-step predictions on held-out validation rows
//!   (or on the training rows when there is no hold-out)
//! - prior method: the `prior_forecast_value` column supplied with the data
//!
//! Zero actuals are excluded from the percentage metrics and counted; they are
//! never treated as zero error.

use tracing::debug;

use crate::domain::{
    AccuracyReport, ComparisonBasis, ModelComparison, MonthPeriod, ObservationSeries, PeriodRange, PeriodVariance,
};
use crate::error::{ErrorContext, ForecastError, Result};
use crate::features::FeatureSet;
use crate::fit::{CandidateFit, ScoredPrediction, score_rows};

/// Score `(actual, predicted)` pairs.
///
/// `scored` must be in period order. Fails on an empty input, on non-finite
/// values, and when every actual is zero (MAPE undefined).
pub fn evaluate(category: &str, scored: &[ScoredPrediction], basis: ComparisonBasis) -> Result<AccuracyReport> {
    let (Some(first), Some(last)) = (scored.first(), scored.last()) else {
        return Err(ForecastError::data(
            ErrorContext::category(category),
            format!("no scored rows for {} evaluation", basis.label()),
        ));
    };
    let window = PeriodRange::new(first.period, last.period);
    let ctx = || ErrorContext::category(category).with_range(window);

    if let Some(bad) = scored.iter().find(|s| !(s.actual.is_finite() && s.predicted.is_finite())) {
        return Err(ForecastError::data(ctx(), format!("non-finite value at {}", bad.period)));
    }

    let n = scored.len() as f64;
    let mut abs_pct_sum = 0.0;
    let mut variance_sum = 0.0;
    let mut pct_rows = 0usize;
    let mut sse = 0.0;
    let mut per_period = Vec::with_capacity(scored.len());

    for s in scored {
        let residual = s.actual - s.predicted;
        sse += residual * residual;
        let variance_pct = if s.actual != 0.0 {
            let v = residual / s.actual * 100.0;
            abs_pct_sum += (residual / s.actual).abs();
            variance_sum += v;
            pct_rows += 1;
            Some(v)
        } else {
            None
        };
        per_period.push(PeriodVariance {
            period: s.period,
            actual: s.actual,
            predicted: s.predicted,
            variance_pct,
        });
    }

    if pct_rows == 0 {
        return Err(ForecastError::data(ctx(), "every actual is zero; MAPE is undefined"));
    }

    let mean_actual = scored.iter().map(|s| s.actual).sum::<f64>() / n;
    let ss_tot: f64 = scored.iter().map(|s| (s.actual - mean_actual).powi(2)).sum();
    let r_squared = (ss_tot > 0.0).then(|| 1.0 - sse / ss_tot);

    let report = AccuracyReport {
        mape: abs_pct_sum / pct_rows as f64 * 100.0,
        rmse: (sse / n).sqrt(),
        variance_pct: variance_sum / pct_rows as f64,
        r_squared,
        sample_size: scored.len(),
        zero_actual_excluded: scored.len() - pct_rows,
        compared_against: basis,
        window,
        per_period,
    };
    debug!(
        category,
        basis = basis.label(),
        window = %window,
        mape = report.mape,
        rmse = report.rmse,
        "evaluated"
    );
    Ok(report)
}

/// In-sample report for a fitted candidate: validation rows when there is a
/// hold-out, otherwise the training rows themselves.
pub fn in_sample_report(fit: &CandidateFit, features: &FeatureSet) -> Result<AccuracyReport> {
    if !fit.validation.is_empty() {
        return evaluate(&features.category, &fit.validation, ComparisonBasis::InSample);
    }
    let scored = score_rows(&fit.model, &features.training)?;
    evaluate(&features.category, &scored, ComparisonBasis::InSample)
}

/// Prior-method report over `window`: every month in it that has both an
/// actual and a prior forecast.
pub fn prior_method_report(series: &ObservationSeries, window: PeriodRange) -> Result<AccuracyReport> {
    let scored: Vec<ScoredPrediction> = series
        .points()
        .iter()
        .filter(|p| window.contains(p.period))
        .filter_map(|p| {
            Some(ScoredPrediction {
                period: p.period,
                actual: p.actual?,
                predicted: p.prior_forecast?,
            })
        })
        .collect();
    if scored.is_empty() {
        return Err(ForecastError::data(
            ErrorContext::category(series.category()).with_range(window),
            "no prior forecast values in the evaluation window",
        ));
    }
    evaluate(series.category(), &scored, ComparisonBasis::PriorMethod)
}

/// Compare the prior method with the model on one shared window.
///
/// Both reports must cover exactly the same periods; anything else would make
/// the improvement figure meaningless.
pub fn compare(prior: &AccuracyReport, model: &AccuracyReport) -> Result<ModelComparison> {
    if prior.compared_against != ComparisonBasis::PriorMethod {
        return Err(ForecastError::config(
            "comparison_basis",
            format!("left side must be a prior_method report, got {}", prior.compared_against.label()),
        ));
    }
    let periods = |r: &AccuracyReport| r.per_period.iter().map(|p| p.period).collect::<Vec<MonthPeriod>>();
    if prior.window != model.window || periods(prior) != periods(model) {
        return Err(ForecastError::config(
            "evaluation_window",
            format!(
                "prior window {} ({} rows) differs from model window {} ({} rows)",
                prior.window, prior.sample_size, model.window, model.sample_size
            ),
        ));
    }
    if prior.mape == 0.0 {
        return Err(ForecastError::data(
            ErrorContext::default().with_range(prior.window),
            "prior method MAPE is zero; improvement is undefined",
        ));
    }

    Ok(ModelComparison {
        prior: prior.clone(),
        model: model.clone(),
        improvement_pct: (prior.mape - model.mape) / prior.mape * 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelKind;
    use crate::fit::fit_model;
    use crate::series::{IndexOptions, build_series};
    use crate::testutil::{feature_set, monthly_rows};

    fn scored(pairs: &[(f64, f64)]) -> Vec<ScoredPrediction> {
        let start = MonthPeriod::new(2023, 1).unwrap();
        pairs
            .iter()
            .enumerate()
            .map(|(i, &(actual, predicted))| ScoredPrediction {
                period: start.offset(i as i64),
                actual,
                predicted,
            })
            .collect()
    }

    #[test]
    fn metrics_on_known_values() {
        let report = evaluate("Sales", &scored(&[(100.0, 110.0), (200.0, 180.0)]), ComparisonBasis::InSample).unwrap();
        assert!((report.mape - 10.0).abs() < 1e-12);
        assert!((report.rmse - (250.0f64).sqrt()).abs() < 1e-12);
        // (-10% + 10%) / 2
        assert!(report.variance_pct.abs() < 1e-12);
        assert_eq!(report.sample_size, 2);
        assert_eq!(report.window.len(), 2);
        assert_eq!(report.per_period[0].variance_pct, Some(-10.0));
    }

    #[test]
    fn zero_actuals_are_excluded_and_counted() {
        let report = evaluate("Sales", &scored(&[(0.0, 5.0), (50.0, 50.0)]), ComparisonBasis::InSample).unwrap();
        assert_eq!(report.zero_actual_excluded, 1);
        assert_eq!(report.mape, 0.0);
        // RMSE still sees the zero row.
        assert!(report.rmse > 0.0);
        assert_eq!(report.per_period[0].variance_pct, None);

        let err = evaluate("Sales", &scored(&[(0.0, 1.0), (0.0, 0.0)]), ComparisonBasis::InSample).unwrap_err();
        assert!(matches!(err, ForecastError::Data { .. }));
    }

    #[test]
    fn empty_input_is_a_data_error() {
        assert!(evaluate("Sales", &[], ComparisonBasis::PriorMethod).is_err());
    }

    #[test]
    fn exact_predictions_score_zero() {
        let report = evaluate("Sales", &scored(&[(10.0, 10.0), (12.0, 12.0), (11.0, 11.0)]), ComparisonBasis::InSample).unwrap();
        assert_eq!((report.mape, report.rmse), (0.0, 0.0));
        assert_eq!(report.r_squared, Some(1.0));
    }

    #[test]
    fn prior_overestimate_improvement_is_full() {
        let actuals: Vec<f64> = (0..12).map(|i| 100.0 + 5.0 * i as f64).collect();
        let priors: Vec<f64> = actuals.iter().map(|a| a * 1.2).collect();
        let rows = monthly_rows("Sales", &actuals, Some(&priors));
        let s = build_series("Sales", &rows, &IndexOptions { min_periods: 2, range: None }).unwrap();

        let prior = prior_method_report(&s, s.range()).unwrap();
        let model_scored: Vec<ScoredPrediction> = s
            .points()
            .iter()
            .map(|p| ScoredPrediction {
                period: p.period,
                actual: p.actual.unwrap(),
                predicted: p.actual.unwrap(),
            })
            .collect();
        let model = evaluate("Sales", &model_scored, ComparisonBasis::InSample).unwrap();

        let cmp = compare(&prior, &model).unwrap();
        assert!((cmp.prior.mape - 20.0).abs() < 1e-9);
        assert_eq!(cmp.model.mape, 0.0);
        assert!((cmp.improvement_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn mismatched_windows_are_rejected() {
        let actuals: Vec<f64> = (0..12).map(|i| 100.0 + i as f64).collect();
        let priors: Vec<f64> = actuals.iter().map(|a| a * 0.9).collect();
        let rows = monthly_rows("Sales", &actuals, Some(&priors));
        let s = build_series("Sales", &rows, &IndexOptions { min_periods: 2, range: None }).unwrap();

        let full = prior_method_report(&s, s.range()).unwrap();
        let tail = PeriodRange::new(s.range().end.offset(-3), s.range().end);
        let short = prior_method_report(&s, tail).unwrap();
        let model = evaluate(
            "Sales",
            &short
                .per_period
                .iter()
                .map(|p| ScoredPrediction {
                    period: p.period,
                    actual: p.actual,
                    predicted: p.actual,
                })
                .collect::<Vec<_>>(),
            ComparisonBasis::InSample,
        )
        .unwrap();

        assert!(compare(&short, &model).is_ok());
        let err = compare(&full, &model).unwrap_err();
        assert!(matches!(err, ForecastError::Config { parameter: "evaluation_window", .. }));
    }

    #[test]
    fn in_sample_uses_validation_rows() {
        let values: Vec<f64> = (0..24).map(|i| 100.0 + 2.0 * i as f64 + (i % 3) as f64).collect();
        let set = feature_set(&values, 0, true);
        let fit = fit_model(ModelKind::Linear, &set, 0.25).unwrap();
        let report = in_sample_report(&fit, &set).unwrap();
        assert_eq!(report.sample_size, 6);
        assert_eq!(Some(report.window), fit.validation_window());

        let no_holdout = fit_model(ModelKind::Linear, &set, 0.0).unwrap();
        assert_eq!(in_sample_report(&no_holdout, &set).unwrap().sample_size, 24);
    }

    #[test]
    fn constant_actuals_have_no_r_squared() {
        let report = evaluate("Sales", &scored(&[(5.0, 4.0), (5.0, 6.0)]), ComparisonBasis::InSample).unwrap();
        assert_eq!(report.r_squared, None);
        assert!((report.mape - 20.0).abs() < 1e-12);
    }
}
