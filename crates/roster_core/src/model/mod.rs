mod completion;
mod frequency;
mod range;
mod task;

pub use completion::{CellKey, CompletionRecord};
pub use frequency::Frequency;
pub use range::DateRange;
pub use task::TaskDefinition;

use crate::error::AppError;
use time::Date;
use time::macros::format_description;

time::serde::format_description!(pub(crate) iso_date, Date, "[year]-[month]-[day]");

pub fn parse_iso_date(raw: &str) -> Result<Date, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("date is required"));
    }
    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::invalid_input(format!("date must be YYYY-MM-DD, got '{trimmed}'")))
}

pub fn format_iso_date(date: Date) -> String {
    // The fixed numeric description cannot fail for an in-range Date.
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// Lowercases ASCII alphanumerics and collapses every other run of
/// characters into a single `_`. `None` when nothing alphanumeric remains.
pub fn canonical_token(raw: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
