use std::time::Duration;

use serde::Deserialize;

use crate::core::error::CostError;

/// Validate that a resolved endpoint URL uses HTTPS.
///
/// Plain HTTP is accepted only for loopback hosts so local mock servers work.
pub fn validate_endpoint(url: &str, provider_name: &str) -> anyhow::Result<()> {
    if url.starts_with("https://") {
        return Ok(());
    }
    if let Some(rest) = url.strip_prefix("http://") {
        let host = rest.split(['/', ':']).next().unwrap_or_default();
        if matches!(host, "127.0.0.1" | "localhost") {
            return Ok(());
        }
    }
    anyhow::bail!("{}: endpoint must use HTTPS, got: {}", provider_name, url)
}

/// Build the shared HTTP client for a provider.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client, CostError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("cspend/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Accepts provider amounts encoded as either JSON strings or numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Text(String),
    Number(serde_json::Number),
}

impl RawAmount {
    pub fn parse(&self) -> Result<f64, CostError> {
        match self {
            Self::Text(s) => crate::core::error::parse_amount(s),
            Self::Number(n) => crate::core::error::parse_amount(&n.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_endpoint_accepts_https() {
        assert!(validate_endpoint("https://ce.us-east-1.amazonaws.com", "Test").is_ok());
    }

    #[test]
    fn validate_endpoint_rejects_http() {
        let err = validate_endpoint("http://evil.com", "Test").unwrap_err();
        assert!(err.to_string().contains("must use HTTPS"));
    }

    #[test]
    fn validate_endpoint_accepts_loopback_http() {
        assert!(validate_endpoint("http://127.0.0.1:8080", "Test").is_ok());
        assert!(validate_endpoint("http://localhost/", "Test").is_ok());
    }

    #[test]
    fn validate_endpoint_rejects_loopback_lookalike() {
        assert!(validate_endpoint("http://localhost.evil.com", "Test").is_err());
        assert!(validate_endpoint("http://127.0.0.1.nip.io", "Test").is_err());
    }

    #[test]
    fn validate_endpoint_rejects_empty() {
        assert!(validate_endpoint("", "Test").is_err());
    }

    #[test]
    fn validate_endpoint_rejects_file_scheme() {
        assert!(validate_endpoint("file:///etc/passwd", "Test").is_err());
    }

    #[test]
    fn raw_amount_from_string_or_number() {
        let s: RawAmount = serde_json::from_str(r#""12.50""#).unwrap();
        assert!((s.parse().unwrap() - 12.5).abs() < 1e-10);
        let n: RawAmount = serde_json::from_str("7.25").unwrap();
        assert!((n.parse().unwrap() - 7.25).abs() < 1e-10);
    }

    #[test]
    fn raw_amount_rejects_non_numeric_string() {
        let s: RawAmount = serde_json::from_str(r#""twelve""#).unwrap();
        assert!(s.parse().is_err());
    }
}
