pub mod aws;
pub mod fetch;
pub mod hwc;
pub mod signing;

use serde::{Deserialize, Serialize};

use crate::core::config::AppConfig;
use crate::core::error::CostError;
use crate::core::models::cost::{Granularity, UsageAmount};
use crate::core::models::window::TimeWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Aws,
    Hwc,
}

impl Provider {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_lowercase().as_str() {
            "aws" | "amazon" => Some(Self::Aws),
            "hwc" | "huawei" | "huaweicloud" => Some(Self::Hwc),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Hwc => "hwc",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Aws => "AWS",
            Self::Hwc => "Huawei Cloud",
        }
    }

    pub fn all() -> &'static [Provider] {
        &[Provider::Aws, Provider::Hwc]
    }
}

/// Which queries a provider can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Arbitrary day ranges, not just whole billing months.
    pub partial_periods: bool,
    pub forecast: bool,
}

/// A provider's cost-and-usage API.
#[allow(async_fn_in_trait)]
pub trait CostSource {
    fn provider(&self) -> Provider;

    fn capabilities(&self) -> Capabilities;

    fn granularity(&self) -> Granularity;

    /// Sum of unblended cost over `window`.
    async fn fetch_cost(&self, window: &TimeWindow) -> Result<UsageAmount, CostError>;

    /// Forecasted unblended cost for `window`.
    async fn fetch_forecast(&self, window: &TimeWindow) -> Result<UsageAmount, CostError>;
}

/// Concrete provider client selected at runtime.
pub enum AnySource {
    Aws(aws::AwsCostExplorer),
    Hwc(hwc::HwcBss),
}

impl AnySource {
    /// Build the client for `provider` with credentials resolved from `config`
    /// and the environment.
    pub fn build(provider: Provider, config: &AppConfig) -> Result<Self, CostError> {
        let timeout = config.settings.timeout_secs;
        match provider {
            Provider::Aws => {
                let credentials = config.aws_credentials()?;
                Ok(Self::Aws(aws::AwsCostExplorer::new(
                    &config.aws,
                    credentials,
                    timeout,
                )?))
            }
            Provider::Hwc => {
                let credentials = config.hwc_credentials()?;
                Ok(Self::Hwc(hwc::HwcBss::new(&config.hwc, credentials, timeout)?))
            }
        }
    }
}

impl CostSource for AnySource {
    fn provider(&self) -> Provider {
        match self {
            Self::Aws(s) => s.provider(),
            Self::Hwc(s) => s.provider(),
        }
    }

    fn capabilities(&self) -> Capabilities {
        match self {
            Self::Aws(s) => s.capabilities(),
            Self::Hwc(s) => s.capabilities(),
        }
    }

    fn granularity(&self) -> Granularity {
        match self {
            Self::Aws(s) => s.granularity(),
            Self::Hwc(s) => s.granularity(),
        }
    }

    async fn fetch_cost(&self, window: &TimeWindow) -> Result<UsageAmount, CostError> {
        match self {
            Self::Aws(s) => s.fetch_cost(window).await,
            Self::Hwc(s) => s.fetch_cost(window).await,
        }
    }

    async fn fetch_forecast(&self, window: &TimeWindow) -> Result<UsageAmount, CostError> {
        match self {
            Self::Aws(s) => s.fetch_forecast(window).await,
            Self::Hwc(s) => s.fetch_forecast(window).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_id_accepts_aliases() {
        assert_eq!(Provider::from_id("AWS"), Some(Provider::Aws));
        assert_eq!(Provider::from_id("huawei"), Some(Provider::Hwc));
        assert_eq!(Provider::from_id("gcp"), None);
    }

    #[test]
    fn ids_round_trip() {
        for p in Provider::all() {
            assert_eq!(Provider::from_id(p.id()), Some(*p));
        }
    }

    #[test]
    fn build_without_credentials_is_config_error() {
        let mut config = AppConfig::default();
        config.hwc.access_key = None;
        config.hwc.secret_key = None;
        // CLOUD_SDK_* are not expected in the test environment.
        if std::env::var("CLOUD_SDK_AK").is_err() {
            let err = AnySource::build(Provider::Hwc, &config).err().unwrap();
            assert!(matches!(err, CostError::Config(_)));
        }
    }

    #[test]
    fn build_with_file_credentials() {
        let mut config = AppConfig::default();
        config.aws.access_key_id = Some("AKID".to_string());
        config.aws.secret_access_key = Some("secret".to_string());
        let source = AnySource::build(Provider::Aws, &config).unwrap();
        assert_eq!(source.provider(), Provider::Aws);
        assert!(source.capabilities().forecast);
        assert_eq!(source.granularity(), Granularity::Daily);
    }
}
