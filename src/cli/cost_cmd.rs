use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::config::AppConfig;
use crate::core::models::cost::{CostData, CostPayload, CostSummary};
use crate::core::period::BillingPeriods;
use crate::core::providers::{AnySource, Provider};
use crate::core::summary;

/// Parse `--as-of`, defaulting to the current time.
fn resolve_now(as_of: Option<&str>) -> Result<DateTime<Utc>> {
    match as_of {
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .with_context(|| format!("Invalid --as-of '{}' (expected RFC3339)", value)),
        None => Ok(Utc::now()),
    }
}

fn resolve_provider(flag: Option<&str>, config: &AppConfig) -> Result<Provider> {
    let id = flag.unwrap_or(&config.settings.provider);
    match Provider::from_id(id) {
        Some(p) => Ok(p),
        None => {
            let known: Vec<_> = Provider::all().iter().map(|p| p.id()).collect();
            bail!("Unknown provider: '{}' (expected one of: {})", id, known.join(", "))
        }
    }
}

/// Format a summary for stdout in the selected output format.
pub fn render(summary: &CostSummary, opts: &OutputOptions) -> Result<String> {
    match opts.format {
        OutputFormat::Text => Ok(renderer::render_summary(summary, opts.use_color)),
        OutputFormat::Json => {
            let payload = CostPayload {
                data: CostData::from(summary),
            };
            let json = if opts.pretty {
                serde_json::to_string_pretty(&payload)
            } else {
                serde_json::to_string(&payload)
            }
            .context("Failed to serialize cost summary")?;
            Ok(json)
        }
    }
}

pub async fn run(
    provider: Option<String>,
    as_of: Option<String>,
    opts: &OutputOptions,
    config: &AppConfig,
) -> Result<()> {
    let provider = resolve_provider(provider.as_deref(), config)?;
    let now = resolve_now(as_of.as_deref())?;
    let periods = BillingPeriods::from_now(now);
    debug!(provider = provider.id(), %now, "collecting cost summary");
    debug!(
        month_to_date = %periods.month_to_date(),
        same_period = %periods.last_month_comparison(),
        last_month = %periods.last_month_total(),
        forecast = %periods.forecast(),
        "billing periods"
    );

    let source = AnySource::build(provider, config).with_context(|| {
        format!("Failed to set up {} client", provider.display_name())
    })?;
    let summary = summary::collect(&source, &periods).await?;

    println!("{}", render(&summary, opts)?);
    Ok(())
}
