use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::formatter::{percent_change, round_cents};
use crate::core::period::BillingPeriods;
use crate::core::providers::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Daily,
    Monthly,
}

/// A single monetary amount as reported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageAmount {
    pub amount: f64,
    /// Lowercase currency code (e.g., "usd")
    pub currency: String,
}

impl UsageAmount {
    pub fn new(amount: f64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into().to_lowercase(),
        }
    }
}

/// Everything collected for one provider during one run.
#[derive(Debug, Clone)]
pub struct CostSummary {
    pub provider: Provider,
    pub currency: String,
    pub granularity: Granularity,
    pub periods: BillingPeriods,
    pub month_to_date: f64,
    /// Cost for the same elapsed span last month; `None` if the provider
    /// cannot query partial periods.
    pub same_period_last_month: Option<f64>,
    pub last_month_total: f64,
    /// Forecast for the remainder of the current month.
    pub forecast: Option<f64>,
    pub change_vs_same_period: Option<f64>,
    pub change_vs_last_month: Option<f64>,
}

impl CostSummary {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Provider,
        currency: String,
        granularity: Granularity,
        periods: BillingPeriods,
        month_to_date: f64,
        same_period_last_month: Option<f64>,
        last_month_total: f64,
        forecast: Option<f64>,
    ) -> Self {
        let change_vs_same_period =
            same_period_last_month.and_then(|prev| percent_change(month_to_date, prev));
        let projected = forecast.map(|f| month_to_date + f);
        let change_vs_last_month =
            projected.and_then(|total| percent_change(total, last_month_total));
        Self {
            provider,
            currency,
            granularity,
            periods,
            month_to_date,
            same_period_last_month,
            last_month_total,
            forecast,
            change_vs_same_period,
            change_vs_last_month,
        }
    }

    /// Month-to-date spend plus the forecast for the rest of the month.
    pub fn projected_month_total(&self) -> Option<f64> {
        self.forecast.map(|f| self.month_to_date + f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    /// Unix epoch seconds
    pub usage_start: i64,
    /// Unix epoch seconds
    pub usage_end: i64,
    pub usage_cost: f64,
}

/// Machine-readable payload, emitted as `{"data": CostData}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostData {
    pub granularity: Granularity,
    pub currency: String,
    pub month_to_date: Usage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<Usage>,
    pub last_month: Usage,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostPayload {
    pub data: CostData,
}

fn midnight(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn epoch(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp()
}

impl From<&CostSummary> for CostData {
    fn from(summary: &CostSummary) -> Self {
        let p = &summary.periods;
        Self {
            granularity: summary.granularity,
            currency: summary.currency.clone(),
            month_to_date: Usage {
                usage_start: midnight(p.current_month_start),
                usage_end: epoch(&p.now),
                usage_cost: round_cents(summary.month_to_date),
            },
            forecast: summary.forecast.map(|cost| Usage {
                usage_start: epoch(&p.now),
                usage_end: midnight(p.current_month_end),
                usage_cost: round_cents(cost),
            }),
            last_month: Usage {
                usage_start: midnight(p.last_month_start),
                usage_end: midnight(p.current_month_start),
                usage_cost: round_cents(summary.last_month_total),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary(forecast: Option<f64>) -> CostSummary {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        CostSummary::new(
            Provider::Aws,
            "usd".to_string(),
            Granularity::Daily,
            BillingPeriods::from_now(now),
            120.0,
            Some(100.0),
            200.0,
            forecast,
        )
    }

    #[test]
    fn usage_amount_lowercases_currency() {
        assert_eq!(UsageAmount::new(1.0, "USD").currency, "usd");
    }

    #[test]
    fn summary_derives_both_changes() {
        let s = summary(Some(130.0));
        assert!((s.change_vs_same_period.unwrap() - 20.0).abs() < 1e-10);
        assert!((s.projected_month_total().unwrap() - 250.0).abs() < 1e-10);
        assert!((s.change_vs_last_month.unwrap() - 25.0).abs() < 1e-10);
    }

    #[test]
    fn summary_without_forecast_has_no_month_change() {
        let s = summary(None);
        assert!(s.projected_month_total().is_none());
        assert!(s.change_vs_last_month.is_none());
    }

    #[test]
    fn cost_data_uses_period_boundaries() {
        let s = summary(Some(130.0));
        let data = CostData::from(&s);
        // 2024-03-01T00:00:00Z
        assert_eq!(data.month_to_date.usage_start, 1_709_251_200);
        // 2024-03-15T12:00:00Z
        assert_eq!(data.month_to_date.usage_end, 1_710_504_000);
        let forecast = data.forecast.unwrap();
        assert_eq!(forecast.usage_start, 1_710_504_000);
        // 2024-04-01T00:00:00Z
        assert_eq!(forecast.usage_end, 1_711_929_600);
        // 2024-02-01T00:00:00Z
        assert_eq!(data.last_month.usage_start, 1_706_745_600);
        assert_eq!(data.last_month.usage_end, 1_709_251_200);
    }

    #[test]
    fn cost_data_omits_missing_forecast() {
        let data = CostData::from(&summary(None));
        let json = serde_json::to_value(CostPayload { data }).unwrap();
        assert!(json["data"].get("forecast").is_none());
        assert_eq!(json["data"]["granularity"], "daily");
    }
}
