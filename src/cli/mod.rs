//! Command-line parsing for the monthly forecasting engine.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! forecasting code. Every flag maps onto one `EngineConfig` field or one
//! input/output path.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::{
    DEFAULT_HORIZON_MONTHS, DEFAULT_LAG_DEPTH, DEFAULT_MIN_PERIODS, DEFAULT_POLYNOMIAL_DEGREE,
    DEFAULT_VALIDATION_FRACTION, ModelSpec, MonthPeriod, ScenarioAdjustment, ScenarioMode,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fcast", version, about = "Regression-based monthly forecasting and scenario engine")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `FCAST_LOG` overrides.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit, evaluate and project every category, then print and optionally export.
    Forecast(ForecastArgs),
    /// Write a synthetic monthly dataset (Sales, Expenses) to CSV.
    Sample(SampleArgs),
    /// Print a previously exported JSON report.
    Show(ShowArgs),
}

/// Options for `fcast forecast`.
#[derive(Debug, Parser, Clone)]
pub struct ForecastArgs {
    /// Input CSV (`date, category, actual_value[, prior_forecast_value, scenario]`).
    #[arg(short = 'i', long, value_name = "CSV", required_unless_present = "sample", conflicts_with = "sample")]
    pub input: Option<PathBuf>,

    /// Use generated sample data instead of a CSV.
    #[arg(long)]
    pub sample: bool,

    /// Seed for `--sample`.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// First month generated by `--sample` (YYYY-MM).
    #[arg(long, default_value = "2022-01")]
    pub sample_start: MonthPeriod,

    /// Months of history generated by `--sample`.
    #[arg(long, default_value_t = 36)]
    pub sample_months: usize,

    /// Only forecast this category.
    #[arg(short = 'c', long)]
    pub category: Option<String>,

    /// Keep only rows whose `scenario` column matches (e.g. Baseline).
    #[arg(long)]
    pub input_scenario: Option<String>,

    /// First month of the reindex range (YYYY-MM).
    #[arg(long, requires = "to")]
    pub from: Option<MonthPeriod>,

    /// Last month of the reindex range (YYYY-MM). Months past the data are
    /// kept as gaps; the forecast starts after the last observed month.
    #[arg(long, requires = "from")]
    pub to: Option<MonthPeriod>,

    /// Minimum months of history per category.
    #[arg(long, default_value_t = DEFAULT_MIN_PERIODS)]
    pub min_periods: usize,

    /// Number of lagged target values used as regressors (below `--min-periods`).
    #[arg(long = "lags", env = "FCAST_LAG_DEPTH", default_value_t = DEFAULT_LAG_DEPTH)]
    pub lag_depth: usize,

    /// Drop the sine/cosine month-of-year terms.
    #[arg(long)]
    pub no_seasonal: bool,

    /// Which model(s) to fit.
    #[arg(long, value_enum, default_value_t = ModelSpec::Auto)]
    pub model: ModelSpec,

    /// Polynomial trend degree (1-3); with `auto`, the highest degree tried.
    #[arg(long, default_value_t = DEFAULT_POLYNOMIAL_DEGREE)]
    pub degree: u8,

    /// Trailing share of rows held out for validation, in [0, 1).
    #[arg(long, default_value_t = DEFAULT_VALIDATION_FRACTION)]
    pub validation: f64,

    /// Forecast horizon in months (1-24).
    #[arg(short = 'H', long, env = "FCAST_HORIZON", default_value_t = DEFAULT_HORIZON_MONTHS)]
    pub horizon: usize,

    /// Scenario as `name=rate`, e.g. `optimistic=0.05`. Repeatable; replaces
    /// the default optimistic/pessimistic pair.
    #[arg(long = "scenario", value_name = "NAME=RATE", value_parser = parse_scenario)]
    pub scenarios: Vec<ScenarioAdjustment>,

    /// How scenario rates are applied.
    #[arg(long, value_enum, default_value_t = ScenarioMode::Multiplicative)]
    pub scenario_mode: ScenarioMode,

    /// Clamp forecasts at zero.
    #[arg(long)]
    pub non_negative: bool,

    /// Export history, fitted values, baseline and scenarios to a long-format CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the full run report to JSON (readable by `fcast show`).
    #[arg(long = "export-report", value_name = "JSON")]
    pub export_report: Option<PathBuf>,
}

/// Options for `fcast sample`.
#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    /// Output CSV path.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// First month (YYYY-MM).
    #[arg(long, default_value = "2022-01")]
    pub start: MonthPeriod,

    #[arg(long, default_value_t = 36)]
    pub months: usize,
}

/// Options for `fcast show`.
#[derive(Debug, Parser, Clone)]
pub struct ShowArgs {
    /// Report JSON produced by `fcast forecast --export-report`.
    #[arg(long, value_name = "JSON")]
    pub report: PathBuf,

    /// Only print this category.
    #[arg(short = 'c', long)]
    pub category: Option<String>,
}

/// Parse `name=rate`. Percent suffixes are accepted (`up=5%`).
pub fn parse_scenario(s: &str) -> Result<ScenarioAdjustment, String> {
    let (name, rate) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=RATE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing scenario name in '{s}'"));
    }
    let rate = rate.trim();
    let value = match rate.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f64>().map(|v| v / 100.0),
        None => rate.parse::<f64>(),
    }
    .map_err(|_| format!("invalid rate '{rate}' in '{s}'"))?;
    Ok(ScenarioAdjustment::new(name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_flag_forms() {
        assert_eq!(parse_scenario("up=0.05").unwrap(), ScenarioAdjustment::new("up", 0.05));
        assert_eq!(parse_scenario(" down = -5% ").unwrap(), ScenarioAdjustment::new("down", -0.05));
        assert!(parse_scenario("up").is_err());
        assert!(parse_scenario("=0.1").is_err());
        assert!(parse_scenario("up=fast").is_err());
    }

    #[test]
    fn forecast_requires_input_or_sample() {
        assert!(Cli::try_parse_from(["fcast", "forecast"]).is_err());
        assert!(Cli::try_parse_from(["fcast", "forecast", "--sample", "-i", "x.csv"]).is_err());

        let cli = Cli::try_parse_from([
            "fcast", "-vv", "forecast", "--sample", "--scenario", "up=0.1", "--scenario", "down=-10%", "--from",
            "2022-01", "--to", "2024-12",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Forecast(args) = cli.command else {
            panic!("expected forecast");
        };
        assert_eq!(args.scenarios.len(), 2);
        assert_eq!(args.to.unwrap().to_string(), "2024-12");
    }

    #[test]
    fn range_flags_come_in_pairs() {
        assert!(Cli::try_parse_from(["fcast", "forecast", "--sample", "--from", "2022-01"]).is_err());
    }
}
