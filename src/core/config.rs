use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::error::CostError;
use crate::core::models::cost::Granularity;
use crate::core::providers::Provider;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_format")]
    pub default_format: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_format() -> String {
    "text".to_string()
}
fn default_color() -> String {
    "auto".to_string()
}
fn default_provider() -> String {
    "aws".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_format: default_format(),
            color: default_color(),
            provider: default_provider(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(default = "default_aws_region")]
    pub region: String,
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

fn default_aws_region() -> String {
    "us-east-1".to_string()
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_aws_region(),
            granularity: Granularity::default(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
        }
    }
}

/// Huawei Cloud BSS is served from a single international endpoint, so there
/// is no region setting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HwcConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub hwc: HwcConfig,
}

/// Resolved AWS access keys.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// Resolved Huawei Cloud AK/SK credentials.
#[derive(Debug, Clone)]
pub struct HwcCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub domain_id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Get the config file path, respecting XDG_CONFIG_HOME
    pub fn config_path() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("~"))
                    .join(".config")
            });
        config_dir.join("cspend").join("config.toml")
    }

    /// Load config from the default path, falling back to defaults if not found
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Serialize and write this config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve AWS credentials from the process environment and this config.
    pub fn aws_credentials(&self) -> Result<AwsCredentials, CostError> {
        self.aws_credentials_with(|key| std::env::var(key).ok())
    }

    /// Environment values win over the config file.
    pub fn aws_credentials_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<AwsCredentials, CostError> {
        let access_key_id = non_empty(env("AWS_ACCESS_KEY_ID"))
            .or_else(|| non_empty(self.aws.access_key_id.clone()));
        let secret_access_key = non_empty(env("AWS_SECRET_ACCESS_KEY"))
            .or_else(|| non_empty(self.aws.secret_access_key.clone()));
        let session_token = non_empty(env("AWS_SESSION_TOKEN"))
            .or_else(|| non_empty(self.aws.session_token.clone()));
        match (access_key_id, secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Ok(AwsCredentials {
                access_key_id,
                secret_access_key,
                session_token,
            }),
            _ => Err(CostError::Config(
                "AWS credentials not found; set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY \
                 or add them to the [aws] section of the config file"
                    .to_string(),
            )),
        }
    }

    /// Resolve Huawei Cloud credentials from the process environment and this config.
    pub fn hwc_credentials(&self) -> Result<HwcCredentials, CostError> {
        self.hwc_credentials_with(|key| std::env::var(key).ok())
    }

    pub fn hwc_credentials_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<HwcCredentials, CostError> {
        let access_key =
            non_empty(env("CLOUD_SDK_AK")).or_else(|| non_empty(self.hwc.access_key.clone()));
        let secret_key =
            non_empty(env("CLOUD_SDK_SK")).or_else(|| non_empty(self.hwc.secret_key.clone()));
        let domain_id = non_empty(env("CLOUD_SDK_DOMAIN_ID"))
            .or_else(|| non_empty(self.hwc.domain_id.clone()));

        match (access_key, secret_key) {
            (Some(access_key), Some(secret_key)) => Ok(HwcCredentials {
                access_key,
                secret_key,
                domain_id,
            }),
            _ => Err(CostError::Config(
                "Huawei Cloud credentials not found; set CLOUD_SDK_AK and CLOUD_SDK_SK \
                 or add them to the [hwc] section of the config file"
                    .to_string(),
            )),
        }
    }

    /// Validate the config
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !["text", "json"].contains(&self.settings.default_format.as_str()) {
            issues.push(format!(
                "Invalid default_format: '{}' (must be 'text' or 'json')",
                self.settings.default_format
            ));
        }
        if !["auto", "always", "never"].contains(&self.settings.color.as_str()) {
            issues.push(format!(
                "Invalid color: '{}' (must be 'auto', 'always', or 'never')",
                self.settings.color
            ));
        }
        if Provider::from_id(&self.settings.provider).is_none() {
            issues.push(format!(
                "Unknown provider: '{}' (must be 'aws' or 'hwc')",
                self.settings.provider
            ));
        }
        if self.settings.timeout_secs == 0 {
            issues.push("timeout_secs must be greater than zero".to_string());
        }
        if self.aws.region.trim().is_empty() {
            issues.push("[aws] region must not be empty".to_string());
        }
        for (section, endpoint) in [("aws", &self.aws.endpoint), ("hwc", &self.hwc.endpoint)] {
            if let Some(url) = endpoint {
                let label = format!("[{}]", section);
                if let Err(e) = crate::core::providers::fetch::validate_endpoint(url, &label) {
                    issues.push(e.to_string());
                }
            }
        }
        issues
    }
}
