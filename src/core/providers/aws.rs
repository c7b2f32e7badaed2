use std::collections::HashMap;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::{AwsConfig, AwsCredentials};
use crate::core::error::{parse_amount, CostError};
use crate::core::models::cost::{Granularity, UsageAmount};
use crate::core::models::window::TimeWindow;
use crate::core::providers::fetch::{http_client, validate_endpoint};
use crate::core::providers::signing::SigV4;
use crate::core::providers::{Capabilities, CostSource, Provider};

const SERVICE: &str = "ce";
const TARGET_PREFIX: &str = "AWSInsightsIndexService";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const METRIC: &str = "UnblendedCost";
const FORECAST_METRIC: &str = "UNBLENDED_COST";

const AUTH_ERROR_CODES: &[&str] = &[
    "UnrecognizedClientException",
    "InvalidSignatureException",
    "IncompleteSignature",
    "MissingAuthenticationToken",
    "InvalidClientTokenId",
    "ExpiredTokenException",
    "AccessDeniedException",
];

// --- Wire types ---

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DateInterval {
    start: String,
    end: String,
}

impl From<&TimeWindow> for DateInterval {
    fn from(window: &TimeWindow) -> Self {
        Self {
            start: window.start().format("%Y-%m-%d").to_string(),
            end: window.end().format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetCostAndUsageRequest<'a> {
    time_period: DateInterval,
    granularity: &'a str,
    metrics: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    next_page_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetCostForecastRequest<'a> {
    time_period: DateInterval,
    metric: &'a str,
    granularity: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetricValue {
    amount: Option<String>,
    unit: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultByTime {
    #[serde(default)]
    total: HashMap<String, MetricValue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetCostAndUsageResponse {
    #[serde(default)]
    results_by_time: Vec<ResultByTime>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetCostForecastResponse {
    total: Option<MetricValue>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

fn granularity_param(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Daily => "DAILY",
        Granularity::Monthly => "MONTHLY",
    }
}

/// Map a non-2xx Cost Explorer response onto the error taxonomy.
fn api_error(status: u16, body: &str) -> CostError {
    let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|b| b.error_type.as_deref())
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let message = parsed
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.trim().to_string());

    if status == 401 || AUTH_ERROR_CODES.contains(&code.as_str()) {
        return CostError::Auth(format!("{}: {}", code, message));
    }
    CostError::Api {
        status,
        code,
        message,
    }
}

/// Sum `UnblendedCost` over every sub-period of a page.
///
/// Returns the page total and the first currency unit seen.
fn sum_results(results: &[ResultByTime]) -> Result<(f64, Option<String>), CostError> {
    let mut total = 0.0;
    let mut unit = None;
    for period in results {
        let Some(metric) = period.total.get(METRIC) else {
            continue;
        };
        if let Some(amount) = &metric.amount {
            total += parse_amount(amount)?;
        }
        if unit.is_none() {
            unit = metric.unit.clone();
        }
    }
    Ok((total, unit))
}

/// AWS Cost Explorer client.
pub struct AwsCostExplorer {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    region: String,
    credentials: AwsCredentials,
    granularity: Granularity,
}

impl AwsCostExplorer {
    pub fn new(
        config: &AwsConfig,
        credentials: AwsCredentials,
        timeout_secs: u64,
    ) -> Result<Self, CostError> {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://ce.{}.amazonaws.com/", config.region));
        validate_endpoint(&endpoint, "AWS").map_err(|e| CostError::Config(e.to_string()))?;
        let endpoint = reqwest::Url::parse(&endpoint)
            .map_err(|e| CostError::Config(format!("Invalid AWS endpoint '{}': {}", endpoint, e)))?;

        Ok(Self {
            client: http_client(timeout_secs)?,
            endpoint,
            region: config.region.clone(),
            credentials,
            granularity: config.granularity,
        })
    }

    async fn call<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        operation: &str,
        request: &Req,
    ) -> Result<Resp, CostError> {
        let body = serde_json::to_vec(request)
            .map_err(|e| CostError::Config(format!("Failed to serialize {}: {}", operation, e)))?;
        let target = format!("{}.{}", TARGET_PREFIX, operation);

        let signer = SigV4 {
            access_key_id: &self.credentials.access_key_id,
            secret_access_key: &self.credentials.secret_access_key,
            session_token: self.credentials.session_token.as_deref(),
            region: &self.region,
            service: SERVICE,
        };
        let signed = signer.sign(
            "POST",
            &self.endpoint,
            &[("content-type", CONTENT_TYPE), ("x-amz-target", target.as_str())],
            &body,
            Utc::now(),
        );

        let mut req = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", &target);
        for (key, value) in &signed {
            req = req.header(key.as_str(), value.as_str());
        }

        let response = req.body(body).send().await?;
        let status = response.status();
        debug!(operation, status = status.as_u16(), "cost explorer response");

        let text = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &text));
        }
        serde_json::from_str(&text).map_err(|e| CostError::Api {
            status: status.as_u16(),
            code: "MalformedResponse".to_string(),
            message: format!("Failed to parse {} response: {}", operation, e),
        })
    }

    /// Sum unblended cost over `window`, following pagination.
    pub async fn get_cost_and_usage(&self, window: &TimeWindow) -> Result<UsageAmount, CostError> {
        let mut total = 0.0;
        let mut currency: Option<String> = None;
        let mut result_count = 0usize;
        let mut next_page_token: Option<String> = None;

        loop {
            debug!(%window, page = next_page_token.as_deref(), "GetCostAndUsage");
            let request = GetCostAndUsageRequest {
                time_period: DateInterval::from(window),
                granularity: granularity_param(self.granularity),
                metrics: [METRIC],
                next_page_token: next_page_token.take(),
            };
            let page: GetCostAndUsageResponse = self.call("GetCostAndUsage", &request).await?;

            result_count += page.results_by_time.len();
            let (page_total, unit) = sum_results(&page.results_by_time)?;
            total += page_total;
            if currency.is_none() {
                currency = unit;
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => next_page_token = Some(token),
                _ => break,
            }
        }

        if result_count == 0 {
            return Err(CostError::EmptyResult { window: *window });
        }
        Ok(UsageAmount::new(
            total,
            currency.unwrap_or_else(|| "usd".to_string()),
        ))
    }

    /// Forecasted unblended cost for `window`.
    pub async fn get_cost_forecast(&self, window: &TimeWindow) -> Result<UsageAmount, CostError> {
        debug!(%window, "GetCostForecast");
        let request = GetCostForecastRequest {
            time_period: DateInterval::from(window),
            metric: FORECAST_METRIC,
            granularity: granularity_param(Granularity::Monthly),
        };
        let response: GetCostForecastResponse = self.call("GetCostForecast", &request).await?;

        let total = response
            .total
            .ok_or(CostError::EmptyResult { window: *window })?;
        let amount = total
            .amount
            .as_deref()
            .ok_or(CostError::EmptyResult { window: *window })?;
        Ok(UsageAmount::new(
            parse_amount(amount)?,
            total.unit.unwrap_or_else(|| "usd".to_string()),
        ))
    }
}

impl CostSource for AwsCostExplorer {
    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            partial_periods: true,
            forecast: true,
        }
    }

    fn granularity(&self) -> Granularity {
        self.granularity
    }

    async fn fetch_cost(&self, window: &TimeWindow) -> Result<UsageAmount, CostError> {
        self.get_cost_and_usage(window).await
    }

    async fn fetch_forecast(&self, window: &TimeWindow) -> Result<UsageAmount, CostError> {
        self.get_cost_forecast(window).await
    }
}
