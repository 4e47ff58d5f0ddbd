mod memory;

pub use memory::MemoryLedger;

use crate::error::AppError;
use crate::model::{CellKey, CompletionRecord, DateRange};
use std::collections::BTreeMap;
use time::{Date, OffsetDateTime};

/// The authoritative set of (task, date) completions. It never checks
/// whether a task's rule covers the date it records.
pub trait CompletionLedger: Send + Sync {
    /// Records the completion, or returns the existing record untouched.
    fn complete(&self, task_id: &str, date: Date) -> Result<CompletionRecord, AppError>;

    /// Removes the completion if present. Absent cells are a no-op success.
    fn uncomplete(&self, task_id: &str, date: Date) -> Result<(), AppError>;

    /// Completions for `task_ids` dated inside `range`. An empty id list
    /// selects every task.
    fn list_completions(
        &self,
        task_ids: &[String],
        range: DateRange,
    ) -> Result<LedgerSnapshot, AppError>;
}

/// Read access to "is this cell completed", whatever layers sit behind it.
pub trait CompletionLookup: Sync {
    fn is_completed(&self, task_id: &str, date: Date) -> bool;
}

/// Point-in-time copy of ledger contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    records: BTreeMap<CellKey, OffsetDateTime>,
}

impl LedgerSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: CompletionRecord) {
        self.records
            .insert(CellKey::new(record.task_id, record.date), record.completed_at);
    }

    pub fn contains(&self, key: &CellKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn completed_at(&self, key: &CellKey) -> Option<OffsetDateTime> {
        self.records.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &OffsetDateTime)> {
        self.records.iter()
    }

    pub fn records(&self) -> Vec<CompletionRecord> {
        self.records
            .iter()
            .map(|(key, completed_at)| CompletionRecord {
                task_id: key.task_id.clone(),
                date: key.date,
                completed_at: *completed_at,
            })
            .collect()
    }
}

impl FromIterator<CompletionRecord> for LedgerSnapshot {
    fn from_iter<I: IntoIterator<Item = CompletionRecord>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

impl CompletionLookup for LedgerSnapshot {
    fn is_completed(&self, task_id: &str, date: Date) -> bool {
        self.records.contains_key(&CellKey::new(task_id, date))
    }
}

pub(crate) fn selects(task_ids: &[String], range: &DateRange, key: &CellKey) -> bool {
    range.contains(key.date) && (task_ids.is_empty() || task_ids.contains(&key.task_id))
}
