use crate::ledger::CompletionLookup;
use crate::model::TaskDefinition;
use serde::Serialize;
use time::Date;

/// Per-cell status, recomputed on every read and never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct DerivedStatus {
    pub should_appear: bool,
    pub is_completed: bool,
    pub is_overdue: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    NotApplicable,
    Pending,
    Overdue,
    Completed,
}

impl DerivedStatus {
    /// A cell with no task instance.
    pub fn inert() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CellState {
        if !self.should_appear {
            CellState::NotApplicable
        } else if self.is_completed {
            CellState::Completed
        } else if self.is_overdue {
            CellState::Overdue
        } else {
            CellState::Pending
        }
    }

    /// Applicable, not done, and strictly after today.
    pub fn is_upcoming(&self, date: Date, today: Date) -> bool {
        self.should_appear && !self.is_completed && date > today
    }
}

pub fn resolve(
    task: &TaskDefinition,
    date: Date,
    completions: &impl CompletionLookup,
    today: Date,
) -> DerivedStatus {
    if !task.rule().is_active(date) {
        return DerivedStatus::inert();
    }

    let is_completed = completions.is_completed(&task.id, date);
    DerivedStatus {
        should_appear: true,
        is_completed,
        is_overdue: !is_completed && date < today,
    }
}
