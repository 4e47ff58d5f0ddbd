use crate::error::AppError;
use serde::Serialize;
use time::{Date, Duration};

/// Inclusive span of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    #[serde(with = "crate::model::iso_date")]
    start: Date,
    #[serde(with = "crate::model::iso_date")]
    end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Result<Self, AppError> {
        if end < start {
            return Err(AppError::invalid_input("range end is before its start"));
        }
        Ok(Self { start, end })
    }

    pub fn single(date: Date) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// `days` consecutive dates beginning at `start`; a zero length is
    /// treated as one day.
    pub fn spanning(start: Date, days: u16) -> Self {
        let extra = i64::from(days.max(1)) - 1;
        let end = start.checked_add(Duration::days(extra)).unwrap_or(Date::MAX);
        Self { start, end }
    }

    pub fn fourteen_days_from(start: Date) -> Self {
        Self::spanning(start, 14)
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }

    pub fn len(&self) -> usize {
        ((self.end - self.start).whole_days() + 1) as usize
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(DateRange { start, end })
    }

    pub fn days(&self) -> impl Iterator<Item = Date> + '_ {
        let end = self.end;
        std::iter::successors(Some(self.start), move |day| {
            day.next_day().filter(|next| *next <= end)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::DateRange;
    use time::{Date, Month};

    fn day(month: Month, day: u8) -> Date {
        Date::from_calendar_date(2025, month, day).unwrap()
    }

    #[test]
    fn days_walk_across_month_boundary() {
        let range = DateRange::new(day(Month::January, 30), day(Month::February, 2)).unwrap();
        let days: Vec<Date> = range.days().collect();

        assert_eq!(range.len(), 4);
        assert_eq!(days.len(), 4);
        assert_eq!(days[2], day(Month::February, 1));
    }

    #[test]
    fn new_rejects_inverted_range() {
        let err = DateRange::new(day(Month::March, 2), day(Month::March, 1)).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn fourteen_day_window_is_inclusive() {
        let range = DateRange::fourteen_days_from(day(Month::March, 5));
        assert_eq!(range.end(), day(Month::March, 18));
        assert_eq!(range.len(), 14);
    }

    #[test]
    fn intersect_clips_and_detects_disjoint_ranges() {
        let week = DateRange::spanning(day(Month::April, 1), 7);
        let later = DateRange::spanning(day(Month::April, 5), 10);
        let clipped = week.intersect(&later).unwrap();

        assert_eq!(clipped.start(), day(Month::April, 5));
        assert_eq!(clipped.end(), day(Month::April, 7));
        assert!(week.intersect(&DateRange::single(day(Month::May, 1))).is_none());
    }
}
