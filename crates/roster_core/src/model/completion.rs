use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

/// One cell of the roster: a task on a calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub task_id: String,
    #[serde(with = "crate::model::iso_date")]
    pub date: Date,
}

impl CellKey {
    pub fn new(task_id: impl Into<String>, date: Date) -> Self {
        Self {
            task_id: task_id.into(),
            date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub task_id: String,
    #[serde(with = "crate::model::iso_date")]
    pub date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}

impl CompletionRecord {
    pub fn key(&self) -> CellKey {
        CellKey::new(self.task_id.clone(), self.date)
    }
}
