//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - loads CSV input or generates a sample
//! - runs the forecasting pipeline
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, ForecastArgs, SampleArgs, ShowArgs};
use crate::data::{SampleConfig, generate_sample};
use crate::domain::{EngineConfig, ObservationRow, PeriodRange, ScenarioConfig};
use crate::error::AppError;
use crate::fit::ModelStore;
use crate::io::{IngestFilter, load_observations};
use crate::series::normalize_category;

pub mod pipeline;

/// Environment variable holding the log filter (`tracing_subscriber::EnvFilter` syntax).
pub const LOG_ENV: &str = "FCAST_LOG";

/// Row errors printed before the rest are summarized.
const MAX_ROW_ERRORS_SHOWN: usize = 10;

/// Entry point for the `fcast` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env file is the normal case.
    let _ = dotenvy::dotenv();

    let cli = crate::cli::Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Forecast(args) => handle_forecast(args),
        Command::Sample(args) => handle_sample(args),
        Command::Show(args) => handle_show(args),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    // Only fails if a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_forecast(args: ForecastArgs) -> Result<(), AppError> {
    let config = engine_config_from_args(&args);
    config.validate()?;

    let rows = load_rows(&args)?;
    let mut store = ModelStore::new();
    let run = pipeline::run_all(&rows, &config, &mut store)?;
    let report = run.to_report();

    println!("{}", crate::report::format_report(&report));

    if let Some(path) = &args.export {
        crate::io::write_forecast_csv(path, &report)?;
        info!(path = %path.display(), "wrote forecast CSV");
    }
    if let Some(path) = &args.export_report {
        crate::io::write_report_json(path, &report)?;
        info!(path = %path.display(), "wrote report JSON");
    }

    // Nothing forecast at all: surface the first failure's exit code.
    if run.runs.is_empty() {
        if let Some(first) = run.failures.into_iter().next() {
            return Err(first.error.into());
        }
    }
    Ok(())
}

fn load_rows(args: &ForecastArgs) -> Result<Vec<ObservationRow>, AppError> {
    if args.sample {
        let mut rows = generate_sample(&SampleConfig::new(args.sample_start, args.sample_months, args.seed))?;
        if let Some(want) = &args.category {
            let want = normalize_category(want);
            rows.retain(|r| normalize_category(&r.category) == want);
        }
        if rows.is_empty() {
            return Err(AppError::new(3, "No sample rows match the requested category."));
        }
        return Ok(rows);
    }

    let path = args
        .input
        .as_deref()
        .ok_or_else(|| AppError::new(2, "Either `--input` or `--sample` is required."))?;
    let filter = IngestFilter {
        category: args.category.clone(),
        scenario: args.input_scenario.clone(),
    };
    let data = load_observations(path, &filter)?;
    if !data.row_errors.is_empty() {
        warn!(count = data.row_errors.len(), "skipped invalid CSV rows");
        eprint!("{}", crate::report::format_row_errors(&data.row_errors, MAX_ROW_ERRORS_SHOWN));
    }
    info!(rows_read = data.rows_read, rows_used = data.rows_used, "loaded CSV");
    Ok(data.rows)
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let rows = generate_sample(&SampleConfig::new(args.start, args.months, args.seed))?;
    crate::io::write_observations_csv(&args.output, &rows, "Baseline")?;
    println!("Wrote {} rows to {}", rows.len(), args.output.display());
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let mut report = crate::io::read_report_json(&args.report)?;
    if let Some(want) = &args.category {
        let want = normalize_category(want);
        report.categories.retain(|c| c.category == want);
        report.failures.retain(|f| f.category == want);
        if report.categories.is_empty() && report.failures.is_empty() {
            return Err(AppError::new(3, format!("Category '{want}' is not in the report.")));
        }
    }
    println!("{}", crate::report::format_report(&report));
    Ok(())
}

/// Map forecast flags onto the engine config.
pub fn engine_config_from_args(args: &ForecastArgs) -> EngineConfig {
    let defaults = ScenarioConfig::default();
    let adjustments = if args.scenarios.is_empty() {
        defaults.adjustments
    } else {
        args.scenarios.clone()
    };

    EngineConfig {
        min_periods: args.min_periods,
        requested_range: match (args.from, args.to) {
            (Some(from), Some(to)) => Some(PeriodRange::new(from, to)),
            _ => None,
        },
        lag_depth: args.lag_depth,
        seasonal: !args.no_seasonal,
        model: args.model,
        polynomial_degree: args.degree,
        validation_fraction: args.validation,
        horizon_months: args.horizon,
        scenarios: ScenarioConfig {
            mode: args.scenario_mode,
            adjustments,
        },
        non_negative: args.non_negative,
    }
}
