//! Model selection (linear vs. polynomial) on validation error.
//!
//! The tool fits each candidate kind and compares RMSE on the held-out
//! validation rows. Selection rules:
//! 1. Candidates whose fit is numerically degenerate are skipped (and reported)
//! 2. Choose the candidate with minimum validation RMSE
//! 3. Candidates within a tiny tolerance of the best count as tied; ties go to
//!    the lower degree (linear first)

use rayon::prelude::*;
use tracing::warn;

use crate::domain::{EngineConfig, ModelKind, ModelSpec, validate_degree, validate_validation_fraction};
use crate::error::{ErrorContext, ForecastError, Result};
use crate::features::FeatureSet;
use crate::fit::fitter::{CandidateFit, fit_model};

/// Relative tolerance under which two validation errors are considered equal.
const TIE_RTOL: f64 = 1e-9;
/// Absolute floor for the tie tolerance (exact fits differ only by rounding).
const TIE_ATOL: f64 = 1e-9;

/// Subset of the engine config the fitter needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitConfig {
    pub model: ModelSpec,
    pub polynomial_degree: u8,
    pub validation_fraction: f64,
}

impl From<&EngineConfig> for FitConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            model: config.model,
            polynomial_degree: config.polynomial_degree,
            validation_fraction: config.validation_fraction,
        }
    }
}

/// Output of fitting + selection.
#[derive(Debug, Clone)]
pub struct FitSelection {
    pub best: CandidateFit,
    /// Fits for all candidates that succeeded, in candidate order.
    pub fits: Vec<CandidateFit>,
    /// Candidates that failed to fit and why (for diagnostics).
    pub skipped: Vec<(ModelKind, ForecastError)>,
}

/// Fit every candidate kind and select the best.
pub fn fit_and_select(features: &FeatureSet, config: &FitConfig) -> Result<FitSelection> {
    validate_degree(config.polynomial_degree)?;
    validate_validation_fraction(config.validation_fraction)?;

    let candidates = config.model.candidates(config.polynomial_degree);

    // Candidates are independent; fit them in parallel and keep candidate order.
    let results: Vec<(ModelKind, Result<CandidateFit>)> = candidates
        .par_iter()
        .map(|&kind| (kind, fit_model(kind, features, config.validation_fraction)))
        .collect();

    let mut fits = Vec::new();
    let mut skipped = Vec::new();
    for (kind, result) in results {
        match result {
            Ok(fit) => fits.push(fit),
            Err(err @ ForecastError::Fit { .. }) => {
                warn!(category = %features.category, model = %kind.display_name(), error = %err, "skipping candidate");
                skipped.push((kind, err));
            }
            Err(err) => return Err(err),
        }
    }

    if fits.is_empty() {
        let reasons: Vec<String> = skipped
            .iter()
            .map(|(kind, err)| format!("{}: {err}", kind.display_name()))
            .collect();
        return Err(ForecastError::fit(
            ErrorContext::category(features.category.clone()),
            format!("no candidate model could be fitted ({})", reasons.join("; ")),
        ));
    }

    let best = select_by_validation(&fits);

    Ok(FitSelection { best, fits, skipped })
}

/// Pick the lowest validation RMSE, resolving ties toward lower complexity.
pub fn select_by_validation(fits: &[CandidateFit]) -> CandidateFit {
    let best_rmse = fits
        .iter()
        .map(|f| f.selection_rmse)
        .fold(f64::INFINITY, f64::min);
    let tol = (best_rmse * TIE_RTOL).max(TIE_ATOL);

    let mut by_complexity: Vec<&CandidateFit> = fits.iter().collect();
    by_complexity.sort_by_key(|f| f.model.kind.complexity_rank());

    by_complexity
        .into_iter()
        .find(|f| f.selection_rmse <= best_rmse + tol)
        .unwrap_or(&fits[0])
        .clone()
}
