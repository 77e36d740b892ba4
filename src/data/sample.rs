//! Synthetic monthly financial sample generation.
//!
//! Each category follows
//! `base * 1.01^t * (1 + 0.1 * sin(2π * month / 12)) * noise`
//! with multiplicative noise drawn uniformly from `[0.85, 1.15]`. The prior
//! method's forecast is the noiseless path with a systematic optimistic bias
//! plus its own Gaussian error, which gives the model something to beat.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Normal, Uniform};

use crate::domain::{MonthPeriod, ObservationRow};
use crate::error::AppError;
use crate::math::month_sin;

/// Monthly growth applied to the trend.
const MONTHLY_GROWTH: f64 = 0.01;
/// Amplitude of the annual sine cycle, as a share of the trend.
const SEASONAL_AMPLITUDE: f64 = 0.1;
const NOISE_LOW: f64 = 0.85;
const NOISE_HIGH: f64 = 1.15;
/// Prior-method bias and spread, as shares of the noiseless value.
const PRIOR_BIAS: f64 = 0.06;
const PRIOR_SIGMA: f64 = 0.04;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub start: MonthPeriod,
    pub months: usize,
    /// `(category, base level)` pairs.
    pub categories: Vec<(String, f64)>,
    pub seed: u64,
}

impl SampleConfig {
    pub fn new(start: MonthPeriod, months: usize, seed: u64) -> Self {
        Self {
            start,
            months,
            categories: vec![("Sales".to_string(), 100_000.0), ("Expenses".to_string(), 70_000.0)],
            seed,
        }
    }
}

/// Generate rows for every configured category, ordered by category then month.
pub fn generate_sample(config: &SampleConfig) -> Result<Vec<ObservationRow>, AppError> {
    if config.months == 0 {
        return Err(AppError::new(2, "Sample length must be > 0 months."));
    }
    if config.categories.is_empty() {
        return Err(AppError::new(2, "Sample needs at least one category."));
    }
    if let Some((name, base)) = config.categories.iter().find(|(_, b)| !(b.is_finite() && *b > 0.0)) {
        return Err(AppError::new(2, format!("Base level for '{name}' must be finite and > 0, got {base}.")));
    }

    let mut rng = StdRng::seed_from_u64(sample_seed(config));
    let noise = Uniform::new_inclusive(NOISE_LOW, NOISE_HIGH);
    let prior_error =
        Normal::new(0.0, PRIOR_SIGMA).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut rows = Vec::with_capacity(config.months * config.categories.len());
    for (category, base) in &config.categories {
        for t in 0..config.months {
            let period = config.start.offset(t as i64);
            let date = period
                .first_day()
                .ok_or_else(|| AppError::new(2, format!("Sample period {period} is out of range.")))?;

            let trend = base * (1.0 + MONTHLY_GROWTH).powi(t as i32);
            let expected = trend * (1.0 + SEASONAL_AMPLITUDE * month_sin(period.month()));
            let actual = expected * noise.sample(&mut rng);
            let prior = expected * (1.0 + PRIOR_BIAS + prior_error.sample(&mut rng));

            rows.push(ObservationRow {
                date,
                category: category.clone(),
                actual_value: round_cents(actual),
                prior_forecast_value: Some(round_cents(prior)),
            });
        }
    }
    Ok(rows)
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn sample_seed(config: &SampleConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.seed.hash(&mut hasher);
    config.start.hash(&mut hasher);
    config.months.hash(&mut hasher);
    for (name, base) in &config.categories {
        name.hash(&mut hasher);
        base.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}
