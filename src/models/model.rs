//! Model evaluation for the linear / polynomial family.
//!
//! The fitter and the forecaster rely on two primitive operations:
//! - build a design row for given inputs and term layout (for OLS)
//! - predict the target given coefficients (for residuals and projection)
//!
//! Both walk the same `Term` list, so a model always predicts with exactly the
//! column order it was fitted with.

use crate::domain::{FeatureRow, FeatureSpec, FittedModel, Term};
use crate::math::{month_cos, month_sin, trend_power};

/// Regressor values for one period.
#[derive(Debug, Clone, Copy)]
pub struct DesignInputs<'a> {
    pub time_index: usize,
    pub month: u32,
    /// `lags[0]` is `lag_1`.
    pub lags: &'a [f64],
}

impl<'a> DesignInputs<'a> {
    /// Inputs for a feature row whose lags have already been resolved.
    pub fn from_row(row: &FeatureRow, lags: &'a [f64]) -> Self {
        Self {
            time_index: row.time_index,
            month: row.month,
            lags,
        }
    }
}

fn term_value(term: Term, spec: &FeatureSpec, inputs: &DesignInputs<'_>) -> f64 {
    match term {
        Term::Intercept => 1.0,
        Term::Trend { power } => trend_power(inputs.time_index, spec.trend_scale, power),
        Term::MonthSin => month_sin(inputs.month),
        Term::MonthCos => month_cos(inputs.month),
        Term::Lag { n } => inputs.lags[n - 1],
    }
}

/// Fill a design row for the given term layout.
///
/// # Panics
/// Panics if `out` is shorter than `terms`, or if a `Lag { n }` term refers
/// past the end of `inputs.lags`. Callers size these from the same spec.
pub fn fill_design_row(terms: &[Term], spec: &FeatureSpec, inputs: &DesignInputs<'_>, out: &mut [f64]) {
    for (slot, &term) in out.iter_mut().zip(terms) {
        *slot = term_value(term, spec, inputs);
    }
}

/// Predict the target for the given layout and coefficients.
pub fn predict(terms: &[Term], coefficients: &[f64], spec: &FeatureSpec, inputs: &DesignInputs<'_>) -> f64 {
    terms
        .iter()
        .zip(coefficients)
        .map(|(&term, &beta)| beta * term_value(term, spec, inputs))
        .sum()
}

/// Predict with a fitted model.
pub fn predict_model(model: &FittedModel, inputs: &DesignInputs<'_>) -> f64 {
    predict(&model.terms, &model.coefficients, &model.feature_spec, inputs)
}
