use thiserror::Error;

use crate::core::models::window::TimeWindow;

/// Failures raised while talking to a provider's cost API.
///
/// Every variant is fatal for a run; callers attach the failing step with
/// `anyhow::Context`.
#[derive(Error, Debug)]
pub enum CostError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status} from cost API ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("No cost results returned for {window}")]
    EmptyResult { window: TimeWindow },
    #[error("Invalid amount from provider: '{value}'")]
    InvalidAmount { value: String },
    #[error("Not supported by provider: {0}")]
    Unsupported(String),
}

/// Parse a provider-reported decimal amount.
///
/// Negative values are accepted since credits and refunds show up as such.
pub fn parse_amount(value: &str) -> Result<f64, CostError> {
    let trimmed = value.trim();
    match trimmed.parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(amount),
        _ => Err(CostError::InvalidAmount {
            value: value.to_string(),
        }),
    }
}
