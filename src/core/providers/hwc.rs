use chrono::{Datelike, Months, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::core::config::{HwcConfig, HwcCredentials};
use crate::core::error::CostError;
use crate::core::models::cost::{Granularity, UsageAmount};
use crate::core::models::window::TimeWindow;
use crate::core::providers::fetch::{http_client, validate_endpoint, RawAmount};
use crate::core::providers::signing::SdkHmac;
use crate::core::providers::{Capabilities, CostSource, Provider};

const DEFAULT_ENDPOINT: &str = "https://bss-intl.myhuaweicloud.com";
const MONTHLY_EXPENDITURES_PATH: &str = "/v2/costs/monthly-expenditures";

#[derive(Deserialize)]
struct MonthlyExpendituresResponse {
    currency: Option<String>,
    total_amount: Option<RawAmount>,
}

#[derive(Deserialize)]
struct HwcErrorBody {
    error_code: Option<String>,
    error_msg: Option<String>,
}

fn api_error(status: u16, body: &str) -> CostError {
    let parsed: Option<HwcErrorBody> = serde_json::from_str(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|b| b.error_code.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    let message = parsed
        .and_then(|b| b.error_msg)
        .unwrap_or_else(|| body.trim().to_string());

    if status == 401 || status == 403 {
        return CostError::Auth(format!("{}: {}", code, message));
    }
    CostError::Api {
        status,
        code,
        message,
    }
}

/// Map a window onto a single billing cycle (`YYYY-MM`).
///
/// The window must start on the first of a month and end no later than the
/// first of the following month.
pub fn billing_cycle(window: &TimeWindow) -> Result<String, CostError> {
    let start = window.start();
    let next_cycle = start + Months::new(1);
    if start.day() != 1 || window.end() > next_cycle {
        return Err(CostError::Unsupported(format!(
            "Huawei Cloud bills by calendar month; cannot query {}",
            window
        )));
    }
    Ok(cycle_id(start))
}

fn cycle_id(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Huawei Cloud BSS (international) monthly expenditure client.
pub struct HwcBss {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    credentials: HwcCredentials,
}

impl HwcBss {
    pub fn new(
        config: &HwcConfig,
        credentials: HwcCredentials,
        timeout_secs: u64,
    ) -> Result<Self, CostError> {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        validate_endpoint(&endpoint, "Huawei Cloud")
            .map_err(|e| CostError::Config(e.to_string()))?;
        let endpoint = reqwest::Url::parse(&endpoint)
            .and_then(|base| base.join(MONTHLY_EXPENDITURES_PATH))
            .map_err(|e| {
                CostError::Config(format!("Invalid Huawei Cloud endpoint '{}': {}", endpoint, e))
            })?;

        Ok(Self {
            client: http_client(timeout_secs)?,
            endpoint,
            credentials,
        })
    }

    /// Total expenditure so far for the billing cycle `window` falls in.
    pub async fn monthly_expenditure(&self, window: &TimeWindow) -> Result<UsageAmount, CostError> {
        let cycle = billing_cycle(window)?;
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().clear().append_pair("cycle", &cycle);
        debug!(%cycle, "ListMonthlyExpenditures");

        let signer = SdkHmac {
            access_key: &self.credentials.access_key,
            secret_key: &self.credentials.secret_key,
        };
        let mut extra: Vec<(&str, &str)> = Vec::new();
        if let Some(domain_id) = self.credentials.domain_id.as_deref() {
            extra.push(("x-domain-id", domain_id));
        }
        let signed = signer.sign("GET", &url, &extra, b"", Utc::now());

        let mut req = self
            .client
            .get(url)
            .header("Accept", "application/json");
        for (key, value) in &signed {
            req = req.header(key.as_str(), value.as_str());
        }
        for (key, value) in &extra {
            req = req.header(*key, *value);
        }

        let response = req.send().await?;
        let status = response.status();
        debug!(%cycle, status = status.as_u16(), "bss response");

        let text = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &text));
        }
        let data: MonthlyExpendituresResponse =
            serde_json::from_str(&text).map_err(|e| CostError::Api {
                status: status.as_u16(),
                code: "MalformedResponse".to_string(),
                message: format!("Failed to parse monthly expenditures response: {}", e),
            })?;

        let amount = data
            .total_amount
            .ok_or(CostError::EmptyResult { window: *window })?;
        Ok(UsageAmount::new(
            amount.parse()?,
            data.currency.unwrap_or_else(|| "usd".to_string()),
        ))
    }
}

impl CostSource for HwcBss {
    fn provider(&self) -> Provider {
        Provider::Hwc
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            partial_periods: false,
            forecast: false,
        }
    }

    fn granularity(&self) -> Granularity {
        Granularity::Monthly
    }

    async fn fetch_cost(&self, window: &TimeWindow) -> Result<UsageAmount, CostError> {
        self.monthly_expenditure(window).await
    }

    async fn fetch_forecast(&self, window: &TimeWindow) -> Result<UsageAmount, CostError> {
        Err(CostError::Unsupported(format!(
            "Huawei Cloud does not provide cost forecasts ({})",
            window
        )))
    }
}
