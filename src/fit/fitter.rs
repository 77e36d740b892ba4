//! Low-level fitting routines for a single model kind.
//!
//! Given a `FeatureSet` and a model kind we:
//! - split the trainable rows chronologically into train / validation
//! - build the design matrix for the kind's term layout
//! - solve an OLS problem on the train partition
//! - score the fitted model on the validation partition
//!
//! and return the fitted model together with its validation error.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{FeatureRow, FittedModel, ModelKind, MonthPeriod, PeriodRange, validate_degree, validate_validation_fraction};
use crate::error::{ErrorContext, ForecastError, Result};
use crate::features::FeatureSet;
use crate::math::solve_least_squares;
use crate::models::{DesignInputs, fill_design_row, predict_model};

/// One scored prediction: what the model said vs. what happened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredPrediction {
    pub period: MonthPeriod,
    pub actual: f64,
    pub predicted: f64,
}

/// Fit of a single model kind.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFit {
    pub model: FittedModel,
    pub train_rows: usize,
    pub train_rmse: f64,
    /// Held-out predictions, in period order. Empty when the split fraction is 0.
    pub validation: Vec<ScoredPrediction>,
    /// RMSE on `validation`, or on the train partition when there is none.
    pub selection_rmse: f64,
}

impl CandidateFit {
    pub fn validation_window(&self) -> Option<PeriodRange> {
        match (self.validation.first(), self.validation.last()) {
            (Some(a), Some(b)) => Some(PeriodRange::new(a.period, b.period)),
            _ => None,
        }
    }
}

/// Split rows into `(train, validation)`, keeping time order.
///
/// The validation partition is the trailing `round(n * fraction)` rows, at
/// least one when `fraction > 0`.
pub fn split_chronological(rows: &[FeatureRow], fraction: f64) -> Result<(&[FeatureRow], &[FeatureRow])> {
    validate_validation_fraction(fraction)?;
    if rows.windows(2).any(|w| w[0].period >= w[1].period) {
        return Err(ForecastError::config(
            "validation_fraction",
            "training rows are not in chronological order; refusing to split",
        ));
    }

    let n = rows.len();
    let n_val = if fraction == 0.0 {
        0
    } else {
        ((n as f64 * fraction).round() as usize).max(1).min(n)
    };
    Ok(rows.split_at(n - n_val))
}

/// Fit one model kind on the feature set's training rows.
pub fn fit_model(kind: ModelKind, features: &FeatureSet, validation_fraction: f64) -> Result<CandidateFit> {
    if let ModelKind::Polynomial { degree } = kind {
        validate_degree(degree)?;
    }

    let terms = kind.terms(&features.spec);
    let p = terms.len();
    let (train, validation) = split_chronological(&features.training, validation_fraction)?;

    let ctx = || {
        let ctx = ErrorContext::category(features.category.clone());
        match (train.first(), train.last()) {
            (Some(a), Some(b)) => ctx.with_range(PeriodRange::new(a.period, b.period)),
            _ => ctx,
        }
    };

    if train.len() < p {
        return Err(ForecastError::fit(
            ctx(),
            format!(
                "model {} needs at least {p} training rows, got {}; reduce lag depth or polynomial degree",
                kind.display_name(),
                train.len()
            ),
        ));
    }

    // Build design matrix X and observation vector y.
    let n = train.len();
    let mut x = DMatrix::<f64>::zeros(n, p);
    let mut y = DVector::<f64>::zeros(n);
    let mut design = vec![0.0; p];

    for (i, row) in train.iter().enumerate() {
        let (lags, target) = trainable(row).ok_or_else(|| {
            ForecastError::fit(ctx(), format!("row {} is not trainable", row.period))
        })?;
        fill_design_row(&terms, &features.spec, &DesignInputs::from_row(row, &lags), &mut design);
        for (j, v) in design.iter().enumerate() {
            x[(i, j)] = *v;
        }
        y[i] = target;
    }

    let beta = solve_least_squares(&x, &y).map_err(|e| {
        ForecastError::fit(
            ctx(),
            format!(
                "model {}: {e}; reduce lag depth or polynomial degree",
                kind.display_name()
            ),
        )
    })?;

    let train_window = PeriodRange::new(train[0].period, train[n - 1].period);
    let model = FittedModel {
        category: features.category.clone(),
        kind,
        coefficients: beta.iter().copied().collect(),
        terms,
        feature_spec: features.spec,
        train_window,
    };

    let train_scored = score_rows(&model, train)?;
    let train_rmse = rmse(&train_scored);
    let validation = score_rows(&model, validation)?;
    let selection_rmse = if validation.is_empty() { train_rmse } else { rmse(&validation) };

    debug!(
        category = %features.category,
        model = %kind.display_name(),
        train_rows = n,
        validation_rows = validation.len(),
        train_rmse,
        selection_rmse,
        "fitted candidate"
    );

    Ok(CandidateFit {
        model,
        train_rows: n,
        train_rmse,
        validation,
        selection_rmse,
    })
}

/// One-step-ahead predictions on rows whose lags and target are known.
pub fn score_rows(model: &FittedModel, rows: &[FeatureRow]) -> Result<Vec<ScoredPrediction>> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some((lags, actual)) = trainable(row) else {
            continue;
        };
        let predicted = predict_model(model, &DesignInputs::from_row(row, &lags));
        if !predicted.is_finite() {
            return Err(ForecastError::fit(
                ErrorContext::category(model.category.clone()).with_range(PeriodRange::new(row.period, row.period)),
                "non-finite model prediction",
            ));
        }
        out.push(ScoredPrediction {
            period: row.period,
            actual,
            predicted,
        });
    }
    Ok(out)
}

/// Fitted value for every historical month whose lags are known, `None`
/// elsewhere. Covers prediction-only rows too, for display continuity.
pub fn fitted_history(model: &FittedModel, features: &FeatureSet) -> Vec<(MonthPeriod, Option<f64>)> {
    features
        .all_rows()
        .into_iter()
        .map(|row| {
            let fitted = row
                .complete_lags()
                .map(|lags| predict_model(model, &DesignInputs::from_row(row, &lags)))
                .filter(|v| v.is_finite());
            (row.period, fitted)
        })
        .collect()
}

fn trainable(row: &FeatureRow) -> Option<(Vec<f64>, f64)> {
    Some((row.complete_lags()?, row.target?))
}

fn rmse(scored: &[ScoredPrediction]) -> f64 {
    if scored.is_empty() {
        return 0.0;
    }
    let sse: f64 = scored.iter().map(|s| (s.actual - s.predicted).powi(2)).sum();
    (sse / scored.len() as f64).sqrt()
}
