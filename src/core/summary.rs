use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::models::cost::{CostSummary, UsageAmount};
use crate::core::models::window::TimeWindow;
use crate::core::period::BillingPeriods;
use crate::core::providers::CostSource;

#[derive(Debug, Clone, Copy)]
enum Query {
    Cost,
    Forecast,
}

#[derive(Debug)]
enum Outcome {
    Amount(UsageAmount),
    /// Window covers no days; counts as zero without a remote call.
    Empty,
    /// The provider cannot answer this query.
    Skipped,
}

impl Outcome {
    fn value(&self) -> Option<f64> {
        match self {
            Self::Amount(a) => Some(a.amount),
            Self::Empty => Some(0.0),
            Self::Skipped => None,
        }
    }

    fn currency(&self) -> Option<&str> {
        match self {
            Self::Amount(a) => Some(a.currency.as_str()),
            _ => None,
        }
    }
}

async fn run<S: CostSource>(
    source: &S,
    query: Query,
    window: TimeWindow,
    supported: bool,
    step: &'static str,
) -> Result<Outcome> {
    if !supported {
        debug!(step, "skipped: not supported by {}", source.provider().display_name());
        return Ok(Outcome::Skipped);
    }
    if window.is_empty() {
        debug!(step, %window, "skipped: empty window");
        return Ok(Outcome::Empty);
    }
    let amount = match query {
        Query::Cost => source.fetch_cost(&window).await,
        Query::Forecast => source.fetch_forecast(&window).await,
    }
    .with_context(|| format!("Failed to fetch {}", step))?;
    debug!(step, %window, amount = amount.amount, "fetched");
    Ok(Outcome::Amount(amount))
}

/// Query every window for one provider and assemble the summary.
///
/// The queries are independent and run concurrently; the first failure
/// aborts the run.
pub async fn collect<S: CostSource>(source: &S, periods: &BillingPeriods) -> Result<CostSummary> {
    let caps = source.capabilities();

    let (month_to_date, same_period, last_month, forecast) = tokio::try_join!(
        run(source, Query::Cost, periods.month_to_date(), true, "month-to-date cost"),
        run(
            source,
            Query::Cost,
            periods.last_month_comparison(),
            caps.partial_periods,
            "last month cost for the same period",
        ),
        run(source, Query::Cost, periods.last_month_total(), true, "last month's total cost"),
        run(source, Query::Forecast, periods.forecast(), caps.forecast, "forecast"),
    )?;

    let outcomes = [&month_to_date, &same_period, &last_month, &forecast];
    let mut currencies = outcomes.iter().filter_map(|o| o.currency());
    let currency = currencies.next().unwrap_or("usd").to_string();
    if let Some(other) = currencies.find(|c| *c != currency) {
        warn!(expected = %currency, found = other, "provider reported mixed currencies");
    }

    Ok(CostSummary::new(
        source.provider(),
        currency,
        source.granularity(),
        *periods,
        month_to_date.value().unwrap_or_default(),
        same_period.value(),
        last_month.value().unwrap_or_default(),
        forecast.value(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::CostError;
    use crate::core::models::cost::{CostData, CostPayload, Granularity};
    use crate::core::providers::{Capabilities, Provider};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Mutex;

    struct MockSource {
        capabilities: Capabilities,
        month_to_date: f64,
        same_period: f64,
        last_month: f64,
        forecast: f64,
        fail_forecast: bool,
        calls: Mutex<Vec<TimeWindow>>,
        periods: BillingPeriods,
    }

    impl MockSource {
        fn new(now: DateTime<Utc>) -> Self {
            Self {
                capabilities: Capabilities {
                    partial_periods: true,
                    forecast: true,
                },
                month_to_date: 123.456,
                same_period: 100.0,
                last_month: 240.0,
                forecast: 140.0,
                fail_forecast: false,
                calls: Mutex::new(Vec::new()),
                periods: BillingPeriods::from_now(now),
            }
        }

        fn calls(&self) -> Vec<TimeWindow> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CostSource for MockSource {
        fn provider(&self) -> Provider {
            Provider::Aws
        }

        fn capabilities(&self) -> Capabilities {
            self.capabilities
        }

        fn granularity(&self) -> Granularity {
            Granularity::Daily
        }

        async fn fetch_cost(&self, window: &TimeWindow) -> Result<UsageAmount, CostError> {
            self.calls.lock().unwrap().push(*window);
            let amount = if *window == self.periods.month_to_date() {
                self.month_to_date
            } else if *window == self.periods.last_month_comparison() {
                self.same_period
            } else if *window == self.periods.last_month_total() {
                self.last_month
            } else {
                return Err(CostError::Unsupported(format!("unexpected window {}", window)));
            };
            Ok(UsageAmount::new(amount, "USD"))
        }

        async fn fetch_forecast(&self, window: &TimeWindow) -> Result<UsageAmount, CostError> {
            self.calls.lock().unwrap().push(*window);
            if self.fail_forecast {
                return Err(CostError::Api {
                    status: 400,
                    code: "DataUnavailableException".to_string(),
                    message: "Insufficient amount of historical data".to_string(),
                });
            }
            Ok(UsageAmount::new(self.forecast, "USD"))
        }
    }

    fn mid_march() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn collect_assembles_summary() {
        let source = MockSource::new(mid_march());
        let summary = collect(&source, &source.periods).await.unwrap();

        assert_eq!(summary.currency, "usd");
        assert!((summary.month_to_date - 123.456).abs() < 1e-10);
        assert_eq!(summary.same_period_last_month, Some(100.0));
        assert!((summary.last_month_total - 240.0).abs() < 1e-10);
        assert_eq!(summary.forecast, Some(140.0));
        assert!((summary.change_vs_same_period.unwrap() - 23.456).abs() < 1e-9);
        assert_eq!(source.calls().len(), 4);
    }

    #[tokio::test]
    async fn json_payload_matches_mocked_amounts() {
        let source = MockSource::new(mid_march());
        let summary = collect(&source, &source.periods).await.unwrap();
        let payload = CostPayload {
            data: CostData::from(&summary),
        };
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["data"]["month_to_date"]["usage_cost"], 123.46);
        assert_eq!(json["data"]["forecast"]["usage_cost"], 140.0);
        assert_eq!(json["data"]["last_month"]["usage_cost"], 240.0);
        assert_eq!(json["data"]["currency"], "usd");
        assert_eq!(json["data"]["granularity"], "daily");
    }

    #[tokio::test]
    async fn empty_windows_are_not_sent() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap();
        let source = MockSource::new(now);
        let summary = collect(&source, &source.periods).await.unwrap();

        let calls = source.calls();
        assert!(!calls.contains(&source.periods.month_to_date()));
        assert!(!calls.contains(&source.periods.last_month_comparison()));
        assert_eq!(calls.len(), 2);
        assert_eq!(summary.month_to_date, 0.0);
        assert_eq!(summary.same_period_last_month, Some(0.0));
        assert_eq!(summary.change_vs_same_period, None);
    }

    #[tokio::test]
    async fn unsupported_queries_are_skipped() {
        let mut source = MockSource::new(mid_march());
        source.capabilities = Capabilities {
            partial_periods: false,
            forecast: false,
        };
        let summary = collect(&source, &source.periods).await.unwrap();

        assert_eq!(summary.same_period_last_month, None);
        assert_eq!(summary.forecast, None);
        assert_eq!(summary.change_vs_last_month, None);
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test]
    async fn failure_names_the_step() {
        let mut source = MockSource::new(mid_march());
        source.fail_forecast = true;
        let err = collect(&source, &source.periods).await.unwrap_err();

        let chain = format!("{:#}", err);
        assert!(chain.contains("Failed to fetch forecast"), "got: {}", chain);
        assert!(chain.contains("DataUnavailableException"));
    }

    #[tokio::test]
    async fn zero_previous_month_reports_undefined_change() {
        let mut source = MockSource::new(mid_march());
        source.same_period = 0.0;
        source.last_month = 0.0;
        let summary = collect(&source, &source.periods).await.unwrap();

        assert_eq!(summary.change_vs_same_period, None);
        assert_eq!(summary.change_vs_last_month, None);
    }
}
