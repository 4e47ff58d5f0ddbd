pub mod board;
pub mod config;
pub mod error;
pub mod grid;
pub mod ledger;
pub mod model;
pub mod overlay;
pub mod recurrence;
pub mod roster_api;
pub mod status;
pub mod storage;

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::model::{Frequency, TaskDefinition};
    use time::macros::{date, datetime};

    #[test]
    fn task_definition_has_required_fields() {
        let task = TaskDefinition {
            id: "task-1".to_string(),
            name: "Degrease hood".to_string(),
            frequency: Frequency::Weekly,
            anchor_date: date!(2025 - 03 - 03),
            area: None,
            active: true,
            created_at: datetime!(2025-03-01 09:00 UTC),
            created_on: None,
            updated_at: datetime!(2025-03-01 09:00 UTC),
        };

        assert_eq!(task.id, "task-1");
        assert_eq!(task.name, "Degrease hood");
        assert_eq!(task.frequency, Frequency::Weekly);
        assert_eq!(task.valid_from(), date!(2025 - 03 - 01));
        assert!(task.rule().is_active(date!(2025 - 03 - 10)));
        assert!(!task.rule().is_active(date!(2025 - 03 - 11)));
    }

    #[test]
    fn valid_from_prefers_local_creation_day_and_never_passes_anchor() {
        let mut task = TaskDefinition {
            id: "task-1".to_string(),
            name: "Descale".to_string(),
            frequency: Frequency::Daily,
            anchor_date: date!(2025 - 03 - 10),
            area: None,
            active: true,
            created_at: datetime!(2025-03-05 01:00 UTC),
            created_on: Some(date!(2025 - 03 - 04)),
            updated_at: datetime!(2025-03-05 01:00 UTC),
        };
        assert_eq!(task.valid_from(), date!(2025 - 03 - 04));

        task.anchor_date = date!(2025 - 03 - 01);
        assert_eq!(task.valid_from(), date!(2025 - 03 - 01));

        let stored = serde_json::to_value(&task).unwrap();
        assert_eq!(stored["created_on"], "2025-03-04");
        task.created_on = None;
        let legacy = serde_json::to_value(&task).unwrap();
        assert!(legacy.get("created_on").is_none());
        let parsed: TaskDefinition = serde_json::from_value(legacy).unwrap();
        assert_eq!(parsed.created_on, None);
    }

    #[test]
    fn app_error_exposes_code() {
        let err = AppError::invalid_input("missing name");
        assert_eq!(err.code(), "invalid_input");
    }
}
