//! Scenario composition on top of a baseline forecast.
//!
//! Multiplicative mode compounds per period, `baseline_t * (1 + rate)^(t + 1)`
//! for the t-th horizon month (0-based), so the scenarios fan out from the
//! baseline. Additive mode shifts every month by the same percentage.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{
    ForecastPoint, ForecastResult, ScenarioConfig, ScenarioDelta, ScenarioMode, ScenarioSummary, validate_scenarios,
};
use crate::error::{ErrorContext, ForecastError, Result};

/// Scenario series plus their summaries. The baseline is carried unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedScenarios {
    pub result: ForecastResult,
    /// In declaration order.
    pub summaries: Vec<ScenarioSummary>,
}

/// Scale factor for the `step`-th horizon month (0-based).
pub fn scenario_factor(mode: ScenarioMode, rate: f64, step: usize) -> f64 {
    match mode {
        ScenarioMode::Multiplicative => (1.0 + rate).powi(step as i32 + 1),
        ScenarioMode::Additive => 1.0 + rate,
    }
}

/// Derive one series per declared scenario from `forecast.baseline`.
///
/// Returns a new `ForecastResult`; `forecast` itself is only read.
pub fn compose(forecast: &ForecastResult, config: &ScenarioConfig) -> Result<ComposedScenarios> {
    validate_scenarios(config)?;
    if forecast.baseline.is_empty() {
        return Err(ForecastError::data(
            ErrorContext::category(forecast.category.clone()).with_range(forecast.horizon()),
            "baseline forecast is empty",
        ));
    }

    let mut scenarios = BTreeMap::new();
    let mut summaries = Vec::with_capacity(config.adjustments.len());

    for adj in &config.adjustments {
        let name = adj.name.trim().to_string();
        let series: Vec<ForecastPoint> = forecast
            .baseline
            .iter()
            .enumerate()
            .map(|(step, p)| ForecastPoint {
                period: p.period,
                value: p.value * scenario_factor(config.mode, adj.rate, step),
            })
            .collect();

        let deltas: Vec<ScenarioDelta> = forecast
            .baseline
            .iter()
            .zip(&series)
            .map(|(b, s)| delta(b, s))
            .collect();
        let mid = (deltas.len() - 1) / 2;
        summaries.push(ScenarioSummary {
            name: name.clone(),
            rate: adj.rate,
            mode: config.mode,
            midpoint: deltas[mid],
            endpoint: deltas[deltas.len() - 1],
            cumulative_delta: deltas.iter().map(|d| d.delta).sum(),
        });
        scenarios.insert(name, series);
    }

    debug!(
        category = %forecast.category,
        scenarios = scenarios.len(),
        mode = ?config.mode,
        "composed scenarios"
    );

    Ok(ComposedScenarios {
        result: ForecastResult {
            scenarios,
            ..forecast.clone()
        },
        summaries,
    })
}

fn delta(baseline: &ForecastPoint, scenario: &ForecastPoint) -> ScenarioDelta {
    let delta = scenario.value - baseline.value;
    ScenarioDelta {
        period: baseline.period,
        baseline: baseline.value,
        value: scenario.value,
        delta,
        delta_pct: (baseline.value != 0.0).then(|| delta / baseline.value * 100.0),
    }
}
