//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the engine code stays clean and testable
//! - output changes are localized (and easy to assert on in tests)
//!
//! Everything formats a `ForecastReport`, so a live run and `fcast show` on a
//! saved report print identically.

use crate::domain::{AccuracyReport, BASELINE_SCENARIO, CategoryReport, ForecastReport, ScenarioSummary, Term};
use crate::io::ingest::RowError;

/// Format the whole report: one block per category, then failures.
pub fn format_report(report: &ForecastReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} {} - Monthly Forecast ===\n", report.tool, report.version));
    let cfg = &report.config;
    out.push_str(&format!(
        "Config: model={:?} degree<={} lags={} seasonal={} validation={:.0}% horizon={}m clamp={}\n",
        cfg.model,
        cfg.polynomial_degree,
        cfg.lag_depth,
        cfg.seasonal,
        cfg.validation_fraction * 100.0,
        cfg.horizon_months,
        cfg.non_negative,
    ));

    for cat in &report.categories {
        out.push('\n');
        out.push_str(&format_category(cat));
    }

    if !report.failures.is_empty() {
        out.push_str("\nFailed categories:\n");
        for f in &report.failures {
            out.push_str(&format!("- {} [{}]: {}\n", f.category, f.kind, f.message));
        }
    }

    out
}

/// Diagnostics, accuracy, forecast table and scenario summary for one category.
pub fn format_category(cat: &CategoryReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("--- {} ---\n", cat.category));
    out.push_str(&format!(
        "History: {} ({} months, {} observed",
        cat.history,
        cat.history.len(),
        cat.observed_months
    ));
    if cat.missing_months.is_empty() {
        out.push_str(")\n");
    } else {
        let missing: Vec<String> = cat.missing_months.iter().map(ToString::to_string).collect();
        out.push_str(&format!(", missing: {})\n", missing.join(", ")));
    }

    out.push_str("\nModel diagnostics:\n");
    for c in &cat.candidates {
        let chosen = if c.kind == cat.model.kind { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<12} train_rows={:<3} train_RMSE={:.3} validation_RMSE={:.3}\n",
            c.kind.display_name(),
            c.train_rows,
            c.train_rmse,
            c.selection_rmse
        ));
    }
    for s in &cat.skipped {
        out.push_str(&format!("  (skipped {}) {}\n", s.kind.display_name(), s.reason));
    }

    out.push_str(&format!(
        "\nChosen model: {} (trained on {})\n",
        cat.model.kind.display_name(),
        cat.model.train_window
    ));
    let labels: Vec<String> = cat.model.terms.iter().map(|t| term_label(*t)).collect();
    out.push_str(&format!("- terms: [{}]\n", labels.join(", ")));
    out.push_str(&format!("- coefs: {}\n", fmt_vec(&cat.model.coefficients)));

    out.push_str("\nAccuracy:\n");
    out.push_str(&format_accuracy(&cat.in_sample));
    if let Some(cmp) = &cat.comparison {
        out.push_str(&format_accuracy(&cmp.prior));
        out.push_str(&format!(
            "- improvement vs prior method: {:.1}% (MAPE {:.2}% -> {:.2}%)\n",
            cmp.improvement_pct, cmp.prior.mape, cmp.model.mape
        ));
    }

    out.push_str(&format!("\nForecast {}:\n", cat.forecast.horizon()));
    out.push_str(&format_forecast_table(cat));

    if !cat.scenarios.is_empty() {
        out.push_str("\nScenarios:\n");
        out.push_str(&format_scenario_table(&cat.scenarios));
    }

    out
}

/// One line per accuracy report.
pub fn format_accuracy(report: &AccuracyReport) -> String {
    let r2 = report.r_squared.map(|v| format!("{v:.4}")).unwrap_or_else(|| "n/a".to_string());
    let mut line = format!(
        "- {:<12} MAPE={:.2}% RMSE={} R2={} variance={:+.2}% n={} window={}",
        report.compared_against.label(),
        report.mape,
        fmt_value(report.rmse),
        r2,
        report.variance_pct,
        report.sample_size,
        report.window
    );
    if report.zero_actual_excluded > 0 {
        line.push_str(&format!(" (zero actuals excluded: {})", report.zero_actual_excluded));
    }
    line.push('\n');
    line
}

fn format_forecast_table(cat: &CategoryReport) -> String {
    let names: Vec<&String> = cat.forecast.scenarios.keys().collect();
    let mut out = String::new();

    let mut header = format!("{:<8} {:>14}", "period", BASELINE_SCENARIO);
    for name in &names {
        header.push_str(&format!(" {:>14}", truncate(name, 14)));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    let mut rule = format!("{:-<8} {:-<14}", "", "");
    for _ in &names {
        rule.push_str(&format!(" {:-<14}", ""));
    }
    out.push_str(&rule);
    out.push('\n');

    for (i, point) in cat.forecast.baseline.iter().enumerate() {
        let mut line = format!("{:<8} {:>14}", point.period.to_string(), fmt_value(point.value));
        for name in &names {
            let value = cat.forecast.scenarios[*name].get(i).map(|p| fmt_value(p.value)).unwrap_or_default();
            line.push_str(&format!(" {value:>14}"));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn format_scenario_table(summaries: &[ScenarioSummary]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<14} {:>7} {:>14} {:>9} {:>14} {:>9} {:>16}\n",
        "scenario", "rate", "mid_delta", "mid_%", "end_delta", "end_%", "cumulative"
    ));
    for s in summaries {
        out.push_str(&format!(
            "{:<14} {:>+6.1}% {:>14} {:>9} {:>14} {:>9} {:>16}\n",
            truncate(&s.name, 14),
            s.rate * 100.0,
            fmt_value(s.midpoint.delta),
            fmt_pct(s.midpoint.delta_pct),
            fmt_value(s.endpoint.delta),
            fmt_pct(s.endpoint.delta_pct),
            fmt_value(s.cumulative_delta),
        ));
    }
    out
}

/// Summarize ingest row errors, showing at most `max` of them.
pub fn format_row_errors(errors: &[RowError], max: usize) -> String {
    let mut out = format!("Skipped {} invalid row(s):\n", errors.len());
    for e in errors.iter().take(max) {
        let cat = e.category.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default();
        out.push_str(&format!("  line {}{cat}: {}\n", e.line, e.message));
    }
    if errors.len() > max {
        out.push_str(&format!("  ... and {} more\n", errors.len() - max));
    }
    out
}

fn term_label(term: Term) -> String {
    match term {
        Term::Intercept => "intercept".to_string(),
        Term::Trend { power: 1 } => "trend".to_string(),
        Term::Trend { power } => format!("trend^{power}"),
        Term::MonthSin => "month_sin".to_string(),
        Term::MonthCos => "month_cos".to_string(),
        Term::Lag { n } => format!("lag_{n}"),
    }
}

fn fmt_value(v: f64) -> String {
    format!("{v:.2}")
}

fn fmt_pct(v: Option<f64>) -> String {
    v.map(|p| format!("{p:+.2}%")).unwrap_or_else(|| "n/a".to_string())
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
