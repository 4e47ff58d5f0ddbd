use crate::model::{DateRange, Frequency};
use std::num::NonZeroU16;
use time::Date;

const ALTERNATE_DAYS: NonZeroU16 = NonZeroU16::MIN.saturating_add(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub anchor: Date,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency, anchor: Date) -> Self {
        Self { frequency, anchor }
    }

    /// Whether an instance of the task exists on `date`.
    pub fn is_active(&self, date: Date) -> bool {
        match self.frequency {
            Frequency::Weekday(weekday) => date.weekday() == weekday,
            Frequency::EveryNDays(days) => every_n_days(self.anchor, date, days),
            Frequency::Daily => true,
            Frequency::EveryOtherDay => every_n_days(self.anchor, date, ALTERNATE_DAYS),
            Frequency::Weekly => date.weekday() == self.anchor.weekday(),
            Frequency::Monthly => same_clamped_day_of_month(self.anchor, date),
            Frequency::EveryThreeMonths => {
                same_clamped_day_of_month(self.anchor, date)
                    && (month_index(date) - month_index(self.anchor)).rem_euclid(3) == 0
            }
        }
    }

    /// Active dates inside `range`, in ascending order.
    pub fn occurrences(&self, range: DateRange) -> Vec<Date> {
        range.days().filter(|date| self.is_active(*date)).collect()
    }
}

pub fn active(rule: &RecurrenceRule, date: Date) -> bool {
    rule.is_active(date)
}

fn every_n_days(anchor: Date, date: Date, days: NonZeroU16) -> bool {
    (date - anchor).whole_days().rem_euclid(i64::from(days.get())) == 0
}

// The anchor's day of month, pulled back to the last day of months too short
// to contain it (an anchor on the 31st lands on Feb 28/29, Apr 30, ...).
fn same_clamped_day_of_month(anchor: Date, date: Date) -> bool {
    let last_day = date.month().length(date.year());
    date.day() == anchor.day().min(last_day)
}

fn month_index(date: Date) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month() as u8) - 1
}
