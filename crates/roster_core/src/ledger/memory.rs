use super::{CompletionLedger, LedgerSnapshot, selects};
use crate::error::AppError;
use crate::model::{CellKey, CompletionRecord, DateRange};
use dashmap::DashMap;
use time::{Date, OffsetDateTime};

/// In-process ledger. Mutations on one cell are serialized by the map's
/// shard lock; cells in different shards never contend.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: DashMap<CellKey, CompletionRecord>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CompletionLedger for MemoryLedger {
    fn complete(&self, task_id: &str, date: Date) -> Result<CompletionRecord, AppError> {
        let trimmed_id = task_id.trim();
        if trimmed_id.is_empty() {
            return Err(AppError::invalid_input("id is required"));
        }

        let record = self
            .records
            .entry(CellKey::new(trimmed_id, date))
            .or_insert_with(|| {
                tracing::debug!(task_id = trimmed_id, %date, "recording completion");
                CompletionRecord {
                    task_id: trimmed_id.to_string(),
                    date,
                    completed_at: OffsetDateTime::now_utc(),
                }
            })
            .value()
            .clone();
        Ok(record)
    }

    fn uncomplete(&self, task_id: &str, date: Date) -> Result<(), AppError> {
        let trimmed_id = task_id.trim();
        if trimmed_id.is_empty() {
            return Err(AppError::invalid_input("id is required"));
        }

        if self.records.remove(&CellKey::new(trimmed_id, date)).is_some() {
            tracing::debug!(task_id = trimmed_id, %date, "removed completion");
        }
        Ok(())
    }

    fn list_completions(
        &self,
        task_ids: &[String],
        range: DateRange,
    ) -> Result<LedgerSnapshot, AppError> {
        Ok(self
            .records
            .iter()
            .filter(|entry| selects(task_ids, &range, entry.key()))
            .map(|entry| entry.value().clone())
            .collect())
    }
}
