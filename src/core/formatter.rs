use chrono::Datelike;

use crate::core::models::window::TimeWindow;

/// `((current - previous) / previous) * 100`, or `None` when undefined.
pub fn percent_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    let change = (current - previous) / previous * 100.0;
    change.is_finite().then_some(change)
}

/// Round to two decimal places.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Returns "$123.45" for usd and "123.45 EUR" for anything else.
pub fn format_money(amount: f64, currency: &str) -> String {
    if currency.eq_ignore_ascii_case("usd") {
        if amount < 0.0 {
            format!("-${:.2}", amount.abs())
        } else {
            format!("${:.2}", amount)
        }
    } else {
        format!("{:.2} {}", amount, currency.to_uppercase())
    }
}

/// Returns "12%" (rounded to the nearest whole number) or "n/a".
pub fn format_percent(change: Option<f64>) -> String {
    match change {
        Some(p) => {
            // Avoid printing "-0%".
            let rounded = p.round();
            let rounded = if rounded == 0.0 { 0.0 } else { rounded };
            format!("{:.0}%", rounded)
        }
        None => "n/a".to_string(),
    }
}

/// Returns "Feb 1 - Feb 14, 2024" using the inclusive last day of the window.
pub fn format_date_range(window: &TimeWindow) -> String {
    let Some(last) = window.last_day() else {
        return "no elapsed days".to_string();
    };
    let start = window.start();
    if start == last {
        return last.format("%b %-d, %Y").to_string();
    }
    if start.year() == last.year() {
        format!("{} - {}", start.format("%b %-d"), last.format("%b %-d, %Y"))
    } else {
        format!(
            "{} - {}",
            start.format("%b %-d, %Y"),
            last.format("%b %-d, %Y")
        )
    }
}
