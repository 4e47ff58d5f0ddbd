use super::Frequency;
use crate::recurrence::RecurrenceRule;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: String,
    pub name: String,
    pub frequency: Frequency,
    /// Reference date the interval, weekly and monthly shapes count from.
    #[serde(with = "crate::model::iso_date")]
    pub anchor_date: Date,
    /// Area, equipment or section the task belongs to. Display only.
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Local calendar day the task was defined on. Absent in stores written
    /// before it was recorded, where the UTC date of `created_at` stands in.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::model::iso_date::option"
    )]
    pub created_on: Option<Date>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

fn default_active() -> bool {
    true
}

impl TaskDefinition {
    pub fn rule(&self) -> RecurrenceRule {
        RecurrenceRule::new(self.frequency, self.anchor_date)
    }

    /// First date the task can have an instance on. Never later than the
    /// anchor, so a task anchored on its creation day shows on that day.
    pub fn valid_from(&self) -> Date {
        self.created_on
            .unwrap_or_else(|| self.created_at.date())
            .min(self.anchor_date)
    }
}
