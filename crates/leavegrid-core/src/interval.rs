use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::datetime::add_days;

/// Signed number of calendar days from `a` to `b`.
#[must_use]
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days()
}

/// Inclusive on both ends: a range ending on day X overlaps one starting on day X.
#[must_use]
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && b_start <= a_end
}

#[must_use]
pub fn is_same_day(a: NaiveDateTime, b: NaiveDateTime) -> bool {
    a.date() == b.date()
}

/// An inclusive span of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DayRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DayRange {
    /// Returns `None` when `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    #[must_use]
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Seven days starting at `start`.
    #[must_use]
    pub fn week_from(start: NaiveDate) -> Self {
        Self {
            start,
            end: add_days(start, 6),
        }
    }

    #[must_use]
    pub fn len_days(&self) -> i64 {
        days_between(self.start, self.end) + 1
    }

    #[must_use]
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    #[must_use]
    pub fn overlaps(&self, other: &DayRange) -> bool {
        ranges_overlap(self.start, self.end, other.start, other.end)
    }

    /// The part of `self` that falls inside `window`, if any.
    #[must_use]
    pub fn clamp_to(&self, window: &DayRange) -> Option<DayRange> {
        if !self.overlaps(window) {
            return None;
        }
        Some(DayRange {
            start: self.start.max(window.start),
            end: self.end.min(window.end),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn touching_ranges_overlap() {
        assert!(ranges_overlap(
            ymd(2024, 1, 1),
            ymd(2024, 1, 3),
            ymd(2024, 1, 3),
            ymd(2024, 1, 5)
        ));
        assert!(!ranges_overlap(
            ymd(2024, 1, 1),
            ymd(2024, 1, 2),
            ymd(2024, 1, 3),
            ymd(2024, 1, 5)
        ));
    }

    #[test]
    fn overlap_is_symmetric_and_covers_containment() {
        let outer = DayRange::new(ymd(2024, 3, 1), ymd(2024, 3, 31)).expect("range");
        let inner = DayRange::new(ymd(2024, 3, 10), ymd(2024, 3, 12)).expect("range");
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn days_between_crosses_month_and_is_signed() {
        assert_eq!(days_between(ymd(2024, 2, 28), ymd(2024, 3, 1)), 2);
        assert_eq!(days_between(ymd(2024, 3, 1), ymd(2024, 2, 28)), -2);
        assert_eq!(days_between(ymd(2024, 3, 1), ymd(2024, 3, 1)), 0);
    }

    #[test]
    fn same_day_ignores_time_of_day() {
        let morning = ymd(2024, 5, 6).and_hms_opt(8, 0, 0).expect("time");
        let night = ymd(2024, 5, 6).and_hms_opt(23, 59, 59).expect("time");
        let next = ymd(2024, 5, 7).and_hms_opt(0, 0, 0).expect("time");
        assert!(is_same_day(morning, night));
        assert!(!is_same_day(night, next));
    }

    #[test]
    fn clamp_keeps_only_the_window_part() {
        let week = DayRange::week_from(ymd(2024, 1, 7));
        let long = DayRange::new(ymd(2024, 1, 2), ymd(2024, 1, 9)).expect("range");
        let clamped = long.clamp_to(&week).expect("intersects");
        assert_eq!(clamped.start, ymd(2024, 1, 7));
        assert_eq!(clamped.end, ymd(2024, 1, 9));
        assert_eq!(clamped.len_days(), 3);

        let before = DayRange::new(ymd(2023, 12, 1), ymd(2023, 12, 2)).expect("range");
        assert!(before.clamp_to(&week).is_none());
    }

    #[test]
    fn rejects_reversed_range() {
        assert!(DayRange::new(ymd(2024, 1, 2), ymd(2024, 1, 1)).is_none());
        let single = DayRange::single(ymd(2024, 1, 1));
        assert_eq!(single.len_days(), 1);
        assert!(single.contains(ymd(2024, 1, 1)));
        assert!(!single.contains(ymd(2024, 1, 2)));
    }
}
