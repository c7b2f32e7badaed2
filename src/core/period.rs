use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};

use crate::core::models::window::TimeWindow;

/// Billing period boundaries derived from a single reference instant.
///
/// All month boundaries are UTC calendar dates at 00:00:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriods {
    pub now: DateTime<Utc>,
    pub current_month_start: NaiveDate,
    pub last_month_start: NaiveDate,
    /// Whole 24-hour periods elapsed since `current_month_start`.
    pub days_elapsed: i64,
    /// Exclusive end: `last_month_start + days_elapsed`, capped at
    /// `current_month_start` so the window stays inside last month.
    pub last_month_comparison_end: NaiveDate,
    pub current_month_end: NaiveDate,
}

impl BillingPeriods {
    pub fn from_now(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let current_month_start = today.with_day0(0).unwrap_or(today);
        let last_month_start = current_month_start - Months::new(1);
        let current_month_end = current_month_start + Months::new(1);

        let elapsed = now - current_month_start.and_time(NaiveTime::MIN).and_utc();
        let days_elapsed = elapsed.num_days();

        let last_month_comparison_end =
            (last_month_start + Duration::days(days_elapsed)).min(current_month_start);

        Self {
            now,
            current_month_start,
            last_month_start,
            days_elapsed,
            last_month_comparison_end,
            current_month_end,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    pub fn month_to_date(&self) -> TimeWindow {
        window(self.current_month_start, self.today())
    }

    pub fn last_month_comparison(&self) -> TimeWindow {
        window(self.last_month_start, self.last_month_comparison_end)
    }

    pub fn last_month_total(&self) -> TimeWindow {
        window(self.last_month_start, self.current_month_start)
    }

    pub fn forecast(&self) -> TimeWindow {
        window(self.today(), self.current_month_end)
    }
}

fn window(start: NaiveDate, end: NaiveDate) -> TimeWindow {
    TimeWindow::between(start, end)
}
