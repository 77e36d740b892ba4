//! Keyed store of fitted selections.
//!
//! Repeated requests for the same category, history window and fit settings
//! reuse the earlier fit instead of solving again. The store owns its entries
//! and is owned by the caller; there is no process-wide cache.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::trace;

use crate::domain::{EngineConfig, ObservationSeries, PeriodRange};
use crate::error::Result;
use crate::fit::selection::FitSelection;

/// Identity of a fit: same key means same inputs, same model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelKey {
    pub category: String,
    /// Reindexed history the fit was drawn from. The model's own training
    /// window is narrower (lag and hold-out rows are excluded).
    pub history: PeriodRange,
    /// Hash of every config field that influences fitting.
    pub config_hash: u64,
    /// Content hash of the series, so corrected data never hits a stale entry.
    pub data_fingerprint: u64,
}

impl ModelKey {
    pub fn new(series: &ObservationSeries, config: &EngineConfig) -> Self {
        Self {
            category: series.category().to_string(),
            history: series.range(),
            config_hash: fit_config_hash(config),
            data_fingerprint: series.fingerprint(),
        }
    }
}

/// Hash of the fit-relevant part of the config. Horizon, scenarios and the
/// clamp only affect projection, so they are left out.
pub fn fit_config_hash(config: &EngineConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.min_periods.hash(&mut hasher);
    config.requested_range.hash(&mut hasher);
    config.lag_depth.hash(&mut hasher);
    config.seasonal.hash(&mut hasher);
    config.model.hash(&mut hasher);
    config.polynomial_degree.hash(&mut hasher);
    config.validation_fraction.to_bits().hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Default)]
pub struct ModelStore {
    entries: HashMap<ModelKey, Arc<FitSelection>>,
    hits: u64,
    misses: u64,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &ModelKey) -> Option<Arc<FitSelection>> {
        let found = self.entries.get(key).cloned();
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    pub fn insert(&mut self, key: ModelKey, selection: impl Into<Arc<FitSelection>>) -> Arc<FitSelection> {
        let selection = selection.into();
        self.entries.insert(key, Arc::clone(&selection));
        selection
    }

    /// Return the cached selection, or run `fit` and store its result.
    /// Errors are not cached.
    pub fn get_or_fit<F>(&mut self, key: ModelKey, fit: F) -> Result<Arc<FitSelection>>
    where
        F: FnOnce() -> Result<FitSelection>,
    {
        if let Some(found) = self.get(&key) {
            trace!(category = %key.category, history = %key.history, "model store hit");
            return Ok(found);
        }
        let selection = fit()?;
        Ok(self.insert(key, selection))
    }

    /// Drop every entry for `category`. Returns how many were removed.
    pub fn invalidate_category(&mut self, category: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.category != category);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since the store was created.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
