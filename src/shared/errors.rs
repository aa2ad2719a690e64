//! Error handling for the application

use thiserror::Error;

/// Network fetch errors, surfaced only after the resilient request chain is
/// fully exhausted.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed after all fallback attempts: {0}")]
    NetworkFailure(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Non-success status: {0}")]
    BadStatus(u16),
}

/// Source adapter errors. Always contained at the aggregation boundary:
/// one marketplace failing must never abort its siblings.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Payload could not be parsed: {0}")]
    Parse(String),
}

/// Currency resolution errors. Only caller-contract violations escape the
/// normalizer; a missing or unreachable rate source falls back silently.
#[derive(Error, Debug)]
pub enum CurrencyError {
    #[error("Negative price cannot be normalized: {0}")]
    NegativePrice(f64),
}

/// Forecast errors, reserved for malformed input. A suppressed forecast is
/// not an error and is represented by `ForecastOutcome::NoForecast`.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model training failed: {0}")]
    ModelTrainingFailure(String),
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Currency error: {0}")]
    CurrencyError(String),

    #[error("Forecast error: {0}")]
    ForecastError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        AppError::NetworkError(err.to_string())
    }
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        AppError::NetworkError(err.to_string())
    }
}

impl From<CurrencyError> for AppError {
    fn from(err: CurrencyError) -> Self {
        AppError::CurrencyError(err.to_string())
    }
}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        AppError::ForecastError(err.to_string())
    }
}
