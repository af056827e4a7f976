//! Month-stepped time windows for bounded history queries
//!
//! The history endpoints cap the span of a single query, so a requested
//! interval is split into contiguous calendar-month windows. The iterator
//! is a pure function of its inputs: windows are non-overlapping,
//! increasing, and their union is exactly `[start, end]`.

use chrono::{DateTime, Months, Utc};

/// Lazy iterator over `(window_start, window_end)` pairs
#[derive(Debug, Clone)]
pub struct MonthWindows {
    cursor: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Months,
}

impl Iterator for MonthWindows {
    type Item = (DateTime<Utc>, DateTime<Utc>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.end {
            return None;
        }

        let next = self
            .cursor
            .checked_add_months(self.step)
            .unwrap_or(self.end);
        let window_end = next.min(self.end);
        let window = (self.cursor, window_end);
        self.cursor = window_end;
        Some(window)
    }
}

/// Split `[start, end]` into windows of `step_months` calendar months.
///
/// The last window is clamped to `end` so no request ever covers a future
/// range. An inverted interval (`start >= end`) yields no windows.
pub fn month_windows(start: DateTime<Utc>, end: DateTime<Utc>, step_months: u32) -> MonthWindows {
    MonthWindows {
        cursor: start,
        end,
        step: Months::new(step_months.max(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_three_windows_with_clamped_tail() {
        let windows: Vec<_> =
            month_windows(utc(2023, 1, 1), utc(2023, 3, 15), 1).collect();

        assert_eq!(
            windows,
            vec![
                (utc(2023, 1, 1), utc(2023, 2, 1)),
                (utc(2023, 2, 1), utc(2023, 3, 1)),
                (utc(2023, 3, 1), utc(2023, 3, 15)),
            ]
        );
    }

    #[test]
    fn test_exact_month_boundary_end() {
        let windows: Vec<_> =
            month_windows(utc(2023, 1, 1), utc(2023, 3, 1), 1).collect();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1], (utc(2023, 2, 1), utc(2023, 3, 1)));
    }

    #[test]
    fn test_empty_when_start_equals_end() {
        assert_eq!(month_windows(utc(2023, 1, 1), utc(2023, 1, 1), 1).count(), 0);
    }

    #[test]
    fn test_empty_when_start_after_end() {
        assert_eq!(month_windows(utc(2024, 1, 1), utc(2023, 1, 1), 1).count(), 0);
    }

    #[test]
    fn test_single_partial_window() {
        let windows: Vec<_> =
            month_windows(utc(2023, 1, 1), utc(2023, 1, 20), 1).collect();

        assert_eq!(windows, vec![(utc(2023, 1, 1), utc(2023, 1, 20))]);
    }

    #[test]
    fn test_two_month_step() {
        let windows: Vec<_> =
            month_windows(utc(2023, 1, 1), utc(2023, 7, 1), 2).collect();

        assert_eq!(
            windows,
            vec![
                (utc(2023, 1, 1), utc(2023, 3, 1)),
                (utc(2023, 3, 1), utc(2023, 5, 1)),
                (utc(2023, 5, 1), utc(2023, 7, 1)),
            ]
        );
    }

    #[test]
    fn test_windows_are_contiguous_and_cover_interval() {
        let start = utc(2022, 11, 15);
        let end = utc(2023, 6, 3);
        let windows: Vec<_> = month_windows(start, end, 1).collect();

        assert_eq!(windows.first().unwrap().0, start);
        assert_eq!(windows.last().unwrap().1, end);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
            assert!(pair[0].0 < pair[0].1);
        }
        for (ws, we) in &windows {
            assert!(*we <= end);
            assert!(*ws < *we);
        }
    }

    #[test]
    fn test_iterator_is_restartable() {
        let iter = month_windows(utc(2023, 1, 1), utc(2023, 4, 1), 1);
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
    }
}
