//! Horizon calendar
//!
//! The simulation operates on a rolling historical window of calendar days
//! ending at a fixed end date. All "time advancement" in the seeder is
//! iteration over this ordered day list; there is no concurrency.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Ordered list of calendar days covering the simulation horizon.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use inventory_seeder_core_rs::HorizonCalendar;
///
/// let end = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
/// let cal = HorizonCalendar::ending_at(end, 14);
/// assert_eq!(cal.len(), 14);
/// assert_eq!(cal.end(), end);
/// assert_eq!(cal.start(), NaiveDate::from_ymd_opt(2025, 6, 17).unwrap());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonCalendar {
    days: Vec<NaiveDate>,
}

impl HorizonCalendar {
    /// Build a horizon of `days` consecutive days ending at `end_date` inclusive.
    ///
    /// # Panics
    /// Panics if `days == 0`; zero-length horizons are rejected earlier by
    /// run-config validation.
    pub fn ending_at(end_date: NaiveDate, days: usize) -> Self {
        assert!(days > 0, "horizon must cover at least one day");
        let start = end_date - Duration::days(days as i64 - 1);
        let days = (0..days as i64)
            .map(|i| start + Duration::days(i))
            .collect();
        Self { days }
    }

    /// All days, oldest first.
    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// First day of the horizon.
    pub fn start(&self) -> NaiveDate {
        self.days[0]
    }

    /// Last day of the horizon.
    pub fn end(&self) -> NaiveDate {
        self.days[self.days.len() - 1]
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start() && day <= self.end()
    }

    /// Clamp a (possibly future) day to the horizon end.
    pub fn clamp(&self, day: NaiveDate) -> NaiveDate {
        day.min(self.end())
    }

    /// Whole months in the horizon, minimum 1. Volume targets are
    /// expressed per month and scaled by this.
    pub fn months(&self) -> usize {
        (self.days.len() / 30).max(1)
    }

    /// The trailing `n` days of the horizon (all of it when shorter).
    pub fn last_window(&self, n: usize) -> &[NaiveDate] {
        let start = self.days.len().saturating_sub(n);
        &self.days[start..]
    }
}

/// Render a simulated timestamp (`YYYY-MM-DD HH:MM:SS`) at the given
/// hour/minute on `day`, matching the external system's datetime format.
pub fn datetime_at(day: NaiveDate, hour: u32, minute: u32) -> String {
    format!("{} {:02}:{:02}:00", day.format("%Y-%m-%d"), hour, minute)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    #[should_panic(expected = "horizon must cover at least one day")]
    fn test_zero_day_horizon_panics() {
        HorizonCalendar::ending_at(d(2025, 6, 30), 0);
    }

    #[test]
    fn test_single_day_horizon() {
        let cal = HorizonCalendar::ending_at(d(2025, 6, 30), 1);
        assert_eq!(cal.start(), cal.end());
        assert_eq!(cal.months(), 1);
    }

    #[test]
    fn test_days_are_consecutive() {
        let cal = HorizonCalendar::ending_at(d(2025, 3, 2), 60);
        let days = cal.days();
        for pair in days.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::days(1));
        }
        assert_eq!(cal.months(), 2);
    }

    #[test]
    fn test_clamp_future_date() {
        let cal = HorizonCalendar::ending_at(d(2025, 6, 30), 30);
        assert_eq!(cal.clamp(d(2025, 7, 15)), d(2025, 6, 30));
        assert_eq!(cal.clamp(d(2025, 6, 10)), d(2025, 6, 10));
    }

    #[test]
    fn test_last_window_shorter_horizon() {
        let cal = HorizonCalendar::ending_at(d(2025, 6, 30), 14);
        assert_eq!(cal.last_window(30).len(), 14);
        assert_eq!(cal.last_window(7).len(), 7);
        assert_eq!(cal.last_window(7)[6], d(2025, 6, 30));
    }

    #[test]
    fn test_datetime_at_format() {
        assert_eq!(datetime_at(d(2025, 6, 5), 16, 30), "2025-06-05 16:30:00");
        assert_eq!(datetime_at(d(2025, 6, 5), 8, 0), "2025-06-05 08:00:00");
    }
}
