use crate::error::AppError;
use crate::ledger::CompletionLookup;
use crate::model::{CellKey, DateRange};
use std::collections::HashMap;
use time::Date;

/// Refetches a confirmed entry may disagree with before the ledger wins.
const MAX_DISAGREEING_REFRESHES: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    InFlight,
    /// The ledger accepted the mutation; waiting for a refetch to show it.
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub completed: bool,
    pub seq: u64,
    /// Provisional record id shown for optimistic completions.
    pub temp_id: Option<String>,
    pub state: PendingState,
    disagreements: u8,
}

/// Handle for one toggle; hand it back when the mutation settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub key: CellKey,
    pub seq: u64,
    /// The value the toggle asked the ledger to store.
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Confirmed,
    /// The toggle was the cell's newest entry; display fell back to the
    /// entry beneath it, or to the ledger.
    RolledBack,
    /// The failed toggle had already been overtaken; display is unchanged.
    Superseded,
    /// Nothing pending matches the ticket any more.
    Stale,
}

#[derive(Debug, Default)]
pub struct Overlay {
    next_seq: u64,
    cells: HashMap<CellKey, Vec<PendingEntry>>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn pending(&self, key: &CellKey) -> Option<&PendingEntry> {
        self.cells.get(key).and_then(|stack| stack.last())
    }

    pub fn displayed(&self, key: &CellKey, server_completed: bool) -> bool {
        self.pending(key)
            .map_or(server_completed, |entry| entry.completed)
    }

    /// Flips the displayed value of `key` and records it as in flight.
    pub fn begin_toggle(&mut self, key: CellKey, server_completed: bool) -> Ticket {
        let completed = !self.displayed(&key, server_completed);
        self.next_seq += 1;
        let seq = self.next_seq;

        self.cells.entry(key.clone()).or_default().push(PendingEntry {
            completed,
            seq,
            temp_id: completed.then(|| format!("pending-{seq}")),
            state: PendingState::InFlight,
            disagreements: 0,
        });
        tracing::debug!(
            task_id = %key.task_id,
            date = %key.date,
            seq,
            completed,
            "optimistic toggle"
        );

        Ticket {
            key,
            seq,
            completed,
        }
    }

    /// Applies the outcome of a ticket's ledger mutation.
    pub fn settle<T>(&mut self, ticket: &Ticket, outcome: &Result<T, AppError>) -> Settlement {
        match outcome {
            Ok(_) => self.confirm(ticket),
            Err(_) => self.roll_back(ticket),
        }
    }

    pub fn confirm(&mut self, ticket: &Ticket) -> Settlement {
        let Some(stack) = self.cells.get_mut(&ticket.key) else {
            return Settlement::Stale;
        };
        let Some(index) = stack.iter().position(|entry| entry.seq == ticket.seq) else {
            return Settlement::Stale;
        };

        stack[index].state = PendingState::Confirmed;
        if index + 1 == stack.len() {
            // Older entries can no longer surface once the newest one stuck.
            *stack = stack.split_off(index);
        }
        Settlement::Confirmed
    }

    pub fn roll_back(&mut self, ticket: &Ticket) -> Settlement {
        let Some(stack) = self.cells.get_mut(&ticket.key) else {
            return Settlement::Stale;
        };
        let Some(index) = stack.iter().position(|entry| entry.seq == ticket.seq) else {
            return Settlement::Stale;
        };

        let was_top = index + 1 == stack.len();
        stack.remove(index);
        if stack.is_empty() {
            self.cells.remove(&ticket.key);
        }

        if was_top {
            tracing::warn!(
                task_id = %ticket.key.task_id,
                date = %ticket.key.date,
                seq = ticket.seq,
                "toggle failed, restoring previous state"
            );
            Settlement::RolledBack
        } else {
            Settlement::Superseded
        }
    }

    /// Folds a fresh ledger read into the overlay and returns how many cells
    /// stopped being pending.
    ///
    /// A cell is released only when its newest entry is confirmed and the
    /// ledger agrees with it, so a refetch that raced ahead of a successful
    /// mutation cannot flip the cell back. A confirmed entry the ledger keeps
    /// contradicting is released after a few refetches. Cells outside
    /// `range` were not part of the read and are left alone.
    pub fn reconcile<L>(&mut self, completions: &L, range: DateRange) -> usize
    where
        L: CompletionLookup + ?Sized,
    {
        let before = self.cells.len();
        self.cells.retain(|key, stack| {
            let Some(top) = stack.last_mut() else {
                return false;
            };
            if !range.contains(key.date) {
                return true;
            }
            if top.state != PendingState::Confirmed {
                return true;
            }
            if completions.is_completed(&key.task_id, key.date) == top.completed {
                return false;
            }

            top.disagreements += 1;
            if top.disagreements >= MAX_DISAGREEING_REFRESHES {
                tracing::warn!(
                    task_id = %key.task_id,
                    date = %key.date,
                    seq = top.seq,
                    "ledger keeps disagreeing with confirmed toggle, dropping it"
                );
                return false;
            }
            true
        });

        let released = before - self.cells.len();
        if released > 0 {
            tracing::debug!(released, remaining = self.cells.len(), "overlay reconciled");
        }
        released
    }

    pub fn view<'a, L>(&'a self, base: &'a L) -> OverlayView<'a, L>
    where
        L: CompletionLookup + ?Sized,
    {
        OverlayView {
            overlay: self,
            base,
        }
    }
}

/// The ledger as displayed: pending entries override the fetched values.
pub struct OverlayView<'a, L: ?Sized> {
    overlay: &'a Overlay,
    base: &'a L,
}

impl<L> CompletionLookup for OverlayView<'_, L>
where
    L: CompletionLookup + ?Sized,
{
    fn is_completed(&self, task_id: &str, date: Date) -> bool {
        let server = self.base.is_completed(task_id, date);
        if self.overlay.is_empty() {
            return server;
        }
        self.overlay.displayed(&CellKey::new(task_id, date), server)
    }
}
