//! Report date windows.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors building a [`ReportWindow`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// The start date is after the end date.
    #[error("report window starts after it ends: {from} > {to}")]
    Inverted {
        /// Requested first day.
        from: NaiveDate,
        /// Requested last day.
        to: NaiveDate,
    },
    /// The end date has no following day in the calendar range.
    #[error("report window end date is out of range: {0}")]
    OutOfRange(NaiveDate),
}

/// An inclusive range of calendar days, `from` through `to`.
///
/// In timestamp terms the window is `[from 00:00, (to + 1 day) 00:00)`, so
/// the whole `to` day is included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    from: NaiveDate,
    to: NaiveDate,
}

impl ReportWindow {
    /// Create a window covering `from` through `to`, both inclusive.
    ///
    /// # Errors
    ///
    /// Returns `WindowError::Inverted` if `from > to`, or
    /// `WindowError::OutOfRange` if `to` is the last representable day.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, WindowError> {
        if from > to {
            return Err(WindowError::Inverted { from, to });
        }
        if to.checked_add_days(Days::new(1)).is_none() {
            return Err(WindowError::OutOfRange(to));
        }
        Ok(Self { from, to })
    }

    /// First day of the window.
    #[must_use]
    pub const fn from(&self) -> NaiveDate {
        self.from
    }

    /// Last day of the window.
    #[must_use]
    pub const fn to(&self) -> NaiveDate {
        self.to
    }

    /// Inclusive lower bound: `from` at midnight.
    #[must_use]
    pub const fn start(&self) -> NaiveDateTime {
        self.from.and_time(NaiveTime::MIN)
    }

    /// Exclusive upper bound: midnight of the day after `to`.
    ///
    /// This is also the history cutoff handed to data sources.
    #[must_use]
    pub fn cutoff(&self) -> NaiveDateTime {
        self.to
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX)
            .and_time(NaiveTime::MIN)
    }

    /// Whether a timestamp falls inside the window.
    #[must_use]
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start() <= at && at < self.cutoff()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn june() -> ReportWindow {
        ReportWindow::new(day(2025, 6, 1), day(2025, 6, 30)).unwrap()
    }

    #[test]
    fn test_window_includes_whole_last_day() {
        let last_second = day(2025, 6, 30).and_hms_opt(23, 59, 59).unwrap();
        assert!(june().contains(last_second));
    }

    #[test]
    fn test_window_excludes_next_midnight() {
        let next_midnight = day(2025, 7, 1).and_hms_opt(0, 0, 0).unwrap();
        assert!(!june().contains(next_midnight));
        assert_eq!(june().cutoff(), next_midnight);
    }

    #[test]
    fn test_window_includes_first_midnight_excludes_before() {
        assert!(june().contains(day(2025, 6, 1).and_hms_opt(0, 0, 0).unwrap()));
        assert!(!june().contains(day(2025, 5, 31).and_hms_opt(23, 59, 59).unwrap()));
    }

    #[test]
    fn test_single_day_window() {
        let window = ReportWindow::new(day(2025, 6, 15), day(2025, 6, 15)).unwrap();
        assert!(window.contains(day(2025, 6, 15).and_hms_opt(12, 0, 0).unwrap()));
        assert!(!window.contains(day(2025, 6, 16).and_hms_opt(0, 0, 0).unwrap()));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let err = ReportWindow::new(day(2025, 6, 30), day(2025, 6, 1)).unwrap_err();
        assert!(matches!(err, WindowError::Inverted { .. }));
    }
}
