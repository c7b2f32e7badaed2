use colored::{control, ColoredString, Colorize};

use crate::core::formatter::{format_date_range, format_money, format_percent};
use crate::core::models::cost::CostSummary;

const LABEL_WIDTH: usize = 16;

/// Render a provider's cost summary as a colored (or plain) string.
///
/// Layout:
/// ```text
///  AWS cost summary (usd)
///   Month-to-date     $123.45
///                     12% vs same period last month
///   Same period       $110.22  (Feb 1 - Feb 14, 2024)
///   Forecast          $250.00  month total
///                     5% vs last month
///   Last month        $238.10
/// ```
pub fn render_summary(summary: &CostSummary, use_color: bool) -> String {
    control::set_override(use_color);

    let money = |amount: f64| format_money(amount, &summary.currency);
    let mut lines: Vec<String> = Vec::new();

    let header = format!(
        " {} cost summary ({})",
        summary.provider.display_name(),
        summary.currency
    );
    lines.push(header.bold().to_string());

    lines.push(row("Month-to-date", &money(summary.month_to_date)));
    lines.push(sub_row(
        summary.change_vs_same_period,
        "vs same period last month",
    ));

    let comparison = summary.periods.last_month_comparison();
    let same_period = match summary.same_period_last_month {
        Some(amount) => format!(
            "{}  {}",
            money(amount),
            format!("({})", format_date_range(&comparison)).dimmed()
        ),
        None => "n/a".dimmed().to_string(),
    };
    lines.push(row("Same period", &same_period));

    let forecast = match summary.projected_month_total() {
        Some(total) => format!("{}  {}", money(total), "month total".dimmed()),
        None => "n/a".dimmed().to_string(),
    };
    lines.push(row("Forecast", &forecast));
    lines.push(sub_row(summary.change_vs_last_month, "vs last month"));

    lines.push(row("Last month", &money(summary.last_month_total)));

    lines.join("\n")
}

fn row(label: &str, value: &str) -> String {
    let padded = format!("{:<width$}", label, width = LABEL_WIDTH);
    format!("  {}  {}", padded.cyan(), value)
}

fn sub_row(change: Option<f64>, suffix: &str) -> String {
    let text = format!("{} {}", format_percent(change), suffix);
    format!("  {}  {}", " ".repeat(LABEL_WIDTH), color_by_change(change, &text))
}

/// Rising spend is red, falling spend is green.
fn color_by_change(change: Option<f64>, text: &str) -> ColoredString {
    match change.map(f64::round) {
        Some(p) if p > 0.0 => text.red(),
        Some(p) if p < 0.0 => text.green(),
        Some(_) => text.normal(),
        None => text.dimmed(),
    }
}
