//! Error types.
//!
//! Two layers:
//!
//! - [`ForecastError`]: the engine's closed taxonomy (`Data`, `Config`, `Fit`).
//!   Every variant carries enough context (category, period range, parameter)
//!   for the caller to act on it.
//! - [`AppError`]: what the `fcast` binary reports, with a process exit code.

use std::fmt;

use thiserror::Error;

use crate::domain::PeriodRange;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Where an error happened: which series and which span of months.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    pub category: Option<String>,
    pub range: Option<PeriodRange>,
}

impl ErrorContext {
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            range: None,
        }
    }

    pub fn with_range(mut self, range: PeriodRange) -> Self {
        self.range = Some(range);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.category, &self.range) {
            (Some(c), Some(r)) => write!(f, "category={c}, range={r}"),
            (Some(c), None) => write!(f, "category={c}"),
            (None, Some(r)) => write!(f, "range={r}"),
            (None, None) => write!(f, "no context"),
        }
    }
}

/// Coarse error class, used for exit codes and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Data,
    Config,
    Fit,
}

/// Errors raised by the forecasting engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Malformed or insufficient input series. The caller must fix the data.
    #[error("data error ({context}): {message}")]
    Data { context: ErrorContext, message: String },

    /// Invalid configuration (horizon, degree, scenario names, split).
    #[error("config error: invalid `{parameter}`: {message}")]
    Config {
        parameter: &'static str,
        message: String,
    },

    /// Numerically degenerate fit. Retry with fewer lags or a lower degree.
    #[error("fit error ({context}): {message}")]
    Fit { context: ErrorContext, message: String },
}

impl ForecastError {
    pub fn data(context: ErrorContext, message: impl Into<String>) -> Self {
        Self::Data {
            context,
            message: message.into(),
        }
    }

    pub fn config(parameter: &'static str, message: impl Into<String>) -> Self {
        Self::Config {
            parameter,
            message: message.into(),
        }
    }

    pub fn fit(context: ErrorContext, message: impl Into<String>) -> Self {
        Self::Fit {
            context,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Data { .. } => ErrorKind::Data,
            Self::Config { .. } => ErrorKind::Config,
            Self::Fit { .. } => ErrorKind::Fit,
        }
    }

    /// Only fit failures can succeed on a retry, and only after the caller
    /// reduces model complexity. Nothing is retried internally.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Fit
    }
}

/// Error reported by the command-line front-end.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        let exit_code = match err.kind() {
            ErrorKind::Config => 2,
            ErrorKind::Data => 3,
            ErrorKind::Fit => 4,
        };
        Self::new(exit_code, err.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MonthPeriod;

    #[test]
    fn messages_carry_context() {
        let range = PeriodRange::new(MonthPeriod::new(2024, 1).unwrap(), MonthPeriod::new(2024, 6).unwrap());
        let err = ForecastError::data(ErrorContext::category("Sales").with_range(range), "too short");
        assert_eq!(
            err.to_string(),
            "data error (category=Sales, range=2024-01..2024-06): too short"
        );

        let err = ForecastError::config("horizon_months", "must be <= 24, got 36");
        assert_eq!(
            err.to_string(),
            "config error: invalid `horizon_months`: must be <= 24, got 36"
        );
    }

    #[test]
    fn only_fit_errors_are_retryable() {
        assert!(ForecastError::fit(ErrorContext::default(), "rank").is_retryable());
        assert!(!ForecastError::config("lag_depth", "x").is_retryable());
        assert!(!ForecastError::data(ErrorContext::default(), "x").is_retryable());
    }

    #[test]
    fn app_error_exit_codes_follow_kind() {
        assert_eq!(AppError::from(ForecastError::config("x", "y")).exit_code(), 2);
        assert_eq!(AppError::from(ForecastError::data(ErrorContext::default(), "y")).exit_code(), 3);
        assert_eq!(AppError::from(ForecastError::fit(ErrorContext::default(), "y")).exit_code(), 4);
    }
}
