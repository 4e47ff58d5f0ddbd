use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU16;
use std::str::FromStr;
use time::Weekday;

const MAX_INTERVAL_DAYS: u16 = 3650;

/// How often a task instance exists. Stored and accepted in its canonical
/// textual form (`monday`, `every_3_days`, `monthly`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Frequency {
    /// Weekly, on the named weekday.
    Weekday(Weekday),
    /// Every N days counted from the task's anchor date.
    EveryNDays(NonZeroU16),
    Daily,
    EveryOtherDay,
    /// Every seven days, on the anchor date's weekday.
    Weekly,
    /// On the anchor's day of month, clamped to shorter months.
    Monthly,
    EveryThreeMonths,
}

impl Frequency {
    pub fn every_n_days(days: u16) -> Result<Self, AppError> {
        NonZeroU16::new(days)
            .filter(|days| days.get() <= MAX_INTERVAL_DAYS)
            .map(Self::EveryNDays)
            .ok_or_else(|| {
                AppError::invalid_frequency(format!(
                    "interval must be between 1 and {MAX_INTERVAL_DAYS} days"
                ))
            })
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let token = super::canonical_token(raw)
            .ok_or_else(|| AppError::invalid_frequency("frequency is required"))?;

        if let Some(weekday) = weekday_from_token(&token) {
            return Ok(Self::Weekday(weekday));
        }

        match token.as_str() {
            "daily" | "every_day" => return Ok(Self::Daily),
            "every_other_day" | "alternate_days" => return Ok(Self::EveryOtherDay),
            "weekly" | "every_week" => return Ok(Self::Weekly),
            "monthly" | "every_month" => return Ok(Self::Monthly),
            "every_3_months" | "every_three_months" | "quarterly" => {
                return Ok(Self::EveryThreeMonths);
            }
            _ => {}
        }

        if let Some(count) = token
            .strip_prefix("every_")
            .and_then(|rest| rest.strip_suffix("_days").or_else(|| rest.strip_suffix("_day")))
        {
            let days = count.parse::<u16>().map_err(|_| {
                AppError::invalid_frequency(format!("invalid day interval in '{}'", raw.trim()))
            })?;
            return Self::every_n_days(days);
        }

        Err(AppError::invalid_frequency(format!(
            "unknown frequency '{}'",
            raw.trim()
        )))
    }
}

fn weekday_from_token(token: &str) -> Option<Weekday> {
    let weekday = match token {
        "monday" | "mon" => Weekday::Monday,
        "tuesday" | "tue" | "tues" => Weekday::Tuesday,
        "wednesday" | "wed" => Weekday::Wednesday,
        "thursday" | "thu" | "thurs" => Weekday::Thursday,
        "friday" | "fri" => Weekday::Friday,
        "saturday" | "sat" => Weekday::Saturday,
        "sunday" | "sun" => Weekday::Sunday,
        _ => return None,
    };
    Some(weekday)
}

fn weekday_token(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Monday => "monday",
        Weekday::Tuesday => "tuesday",
        Weekday::Wednesday => "wednesday",
        Weekday::Thursday => "thursday",
        Weekday::Friday => "friday",
        Weekday::Saturday => "saturday",
        Weekday::Sunday => "sunday",
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekday(weekday) => f.write_str(weekday_token(*weekday)),
            Self::EveryNDays(days) => write!(f, "every_{days}_days"),
            Self::Daily => f.write_str("daily"),
            Self::EveryOtherDay => f.write_str("every_other_day"),
            Self::Weekly => f.write_str("weekly"),
            Self::Monthly => f.write_str("monthly"),
            Self::EveryThreeMonths => f.write_str("every_3_months"),
        }
    }
}

impl FromStr for Frequency {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl TryFrom<String> for Frequency {
    type Error = AppError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<Frequency> for String {
    fn from(frequency: Frequency) -> Self {
        frequency.to_string()
    }
}
