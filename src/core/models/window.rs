use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Half-open range of UTC calendar days, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimeWindow {
    /// Returns `None` when `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Builds a window from dates already known to be ordered.
    ///
    /// Inverted input panics in debug builds and collapses to an empty window
    /// at `start` otherwise.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start <= end, "inverted window {} .. {}", start, end);
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Last day covered by the window, or `None` for an empty window.
    pub fn last_day(&self) -> Option<NaiveDate> {
        if self.is_empty() {
            None
        } else {
            Some(self.end - Duration::days(1))
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_rejects_inverted_range() {
        assert!(TimeWindow::new(date(2024, 3, 2), date(2024, 3, 1)).is_none());
    }

    #[test]
    fn between_keeps_ordered_endpoints() {
        let w = TimeWindow::between(date(2024, 3, 1), date(2024, 3, 5));
        assert_eq!(w.start(), date(2024, 3, 1));
        assert_eq!(w.end(), date(2024, 3, 5));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "inverted window")]
    fn between_rejects_inverted_endpoints() {
        TimeWindow::between(date(2024, 3, 5), date(2024, 3, 1));
    }

    #[test]
    fn empty_window_has_no_last_day() {
        let w = TimeWindow::new(date(2024, 3, 1), date(2024, 3, 1)).unwrap();
        assert!(w.is_empty());
        assert_eq!(w.num_days(), 0);
        assert_eq!(w.last_day(), None);
    }

    #[test]
    fn last_day_is_inclusive_end() {
        let w = TimeWindow::new(date(2024, 2, 1), date(2024, 2, 15)).unwrap();
        assert_eq!(w.num_days(), 14);
        assert_eq!(w.last_day(), Some(date(2024, 2, 14)));
        assert_eq!(w.to_string(), "2024-02-01 .. 2024-02-15");
    }
}
