use crate::error::AppError;
use crate::grid::{Grid, build_grid};
use crate::ledger::{CompletionLedger, CompletionLookup, LedgerSnapshot};
use crate::model::{CellKey, DateRange, TaskDefinition};
use crate::overlay::{Overlay, Settlement, Ticket};
use time::Date;

#[derive(Debug)]
pub struct Board {
    tasks: Vec<TaskDefinition>,
    snapshot: LedgerSnapshot,
    overlay: Overlay,
    last_error: Option<AppError>,
}

impl Board {
    pub fn new(tasks: Vec<TaskDefinition>, snapshot: LedgerSnapshot) -> Self {
        Self {
            tasks,
            snapshot,
            overlay: Overlay::new(),
            last_error: None,
        }
    }

    pub fn tasks(&self) -> &[TaskDefinition] {
        &self.tasks
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        &self.snapshot
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// True while the latest refetch failed and the board shows older data.
    pub fn is_stale(&self) -> bool {
        self.last_error.is_some()
    }

    pub fn last_error(&self) -> Option<&AppError> {
        self.last_error.as_ref()
    }

    pub fn is_completed(&self, task_id: &str, date: Date) -> bool {
        self.overlay
            .view(&self.snapshot)
            .is_completed(task_id, date)
    }

    pub fn grid(&self, range: DateRange, today: Date) -> Grid {
        build_grid(
            &self.tasks,
            range,
            today,
            &self.overlay.view(&self.snapshot),
        )
    }

    /// Applies the toggle to the display and returns the ticket describing
    /// the ledger mutation the caller must now issue.
    pub fn begin_toggle(&mut self, task_id: &str, date: Date) -> Result<Ticket, AppError> {
        let trimmed_id = task_id.trim();
        if trimmed_id.is_empty() {
            return Err(AppError::invalid_input("id is required"));
        }

        let task = self
            .tasks
            .iter()
            .find(|task| task.id == trimmed_id)
            .ok_or_else(|| AppError::invalid_input("task not found"))?;
        if !task.active {
            return Err(AppError::invalid_input("task is inactive"));
        }
        if date < task.valid_from() || !task.rule().is_active(date) {
            return Err(AppError::invalid_input(format!(
                "task has no instance on {date}"
            )));
        }

        let server_completed = self.snapshot.is_completed(&task.id, date);
        let key = CellKey::new(task.id.clone(), date);
        Ok(self.overlay.begin_toggle(key, server_completed))
    }

    pub fn finish_toggle<T>(
        &mut self,
        ticket: &Ticket,
        outcome: &Result<T, AppError>,
    ) -> Settlement {
        if let Err(err) = outcome {
            tracing::warn!(
                task_id = %ticket.key.task_id,
                date = %ticket.key.date,
                error = %err,
                "completion mutation failed"
            );
        }
        self.overlay.settle(ticket, outcome)
    }

    /// Toggles a cell end to end. Returns the new displayed value, or the
    /// mutation error once the cell has been rolled back. Failures are not
    /// retried; re-issuing the same toggle is safe.
    pub fn toggle(
        &mut self,
        ledger: &dyn CompletionLedger,
        task_id: &str,
        date: Date,
    ) -> Result<bool, AppError> {
        let ticket = self.begin_toggle(task_id, date)?;
        let outcome = apply_ticket(ledger, &ticket);
        self.finish_toggle(&ticket, &outcome);
        outcome.map(|_| ticket.completed)
    }

    /// Takes in the result of a ledger refetch over `range`. On failure the
    /// last good snapshot and every pending entry are kept and the board
    /// turns stale.
    pub fn apply_refresh(
        &mut self,
        range: DateRange,
        result: Result<LedgerSnapshot, AppError>,
    ) -> Result<usize, AppError> {
        match result {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                self.last_error = None;
                Ok(self.overlay.reconcile(&self.snapshot, range))
            }
            Err(err) => {
                tracing::warn!(error = %err, "refresh failed, keeping last good data");
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn refresh(
        &mut self,
        ledger: &dyn CompletionLedger,
        range: DateRange,
    ) -> Result<usize, AppError> {
        let task_ids: Vec<String> = self
            .tasks
            .iter()
            .filter(|task| task.active)
            .map(|task| task.id.clone())
            .collect();
        if task_ids.is_empty() {
            return self.apply_refresh(range, Ok(LedgerSnapshot::new()));
        }
        self.apply_refresh(range, ledger.list_completions(&task_ids, range))
    }
}

/// Issues the ledger mutation a ticket stands for.
pub fn apply_ticket(ledger: &dyn CompletionLedger, ticket: &Ticket) -> Result<(), AppError> {
    if ticket.completed {
        ledger
            .complete(&ticket.key.task_id, ticket.key.date)
            .map(|_| ())
    } else {
        ledger.uncomplete(&ticket.key.task_id, ticket.key.date)
    }
}
