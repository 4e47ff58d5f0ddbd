pub use crate::model::DateRange;

use crate::error::AppError;
use crate::ledger::CompletionLookup;
use crate::model::TaskDefinition;
use crate::status::{DerivedStatus, resolve};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use time::Date;

/// Named date windows offered to callers (`today | next2days | week | all`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateWindow {
    Today,
    Next2Days,
    Week,
    /// The fixed 14-day window.
    #[default]
    All,
}

impl DateWindow {
    pub fn range(self, today: Date) -> DateRange {
        match self {
            Self::Today => DateRange::single(today),
            Self::Next2Days => DateRange::spanning(today, 3),
            Self::Week => DateRange::spanning(today, 7),
            Self::All => DateRange::fourteen_days_from(today),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Next2Days => "next2days",
            Self::Week => "week",
            Self::All => "all",
        }
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateWindow {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "next2days" | "next_2_days" => Ok(Self::Next2Days),
            "week" => Ok(Self::Week),
            "all" => Ok(Self::All),
            other => Err(AppError::invalid_input(format!(
                "unknown window '{other}' (expected today, next2days, week or all)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridCell {
    #[serde(with = "crate::model::iso_date")]
    pub date: Date,
    #[serde(flatten)]
    pub status: DerivedStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridRow {
    pub task_id: String,
    pub task_name: String,
    pub area: Option<String>,
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grid {
    pub range: DateRange,
    #[serde(with = "crate::model::iso_date")]
    pub today: Date,
    pub rows: Vec<GridRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GridSummary {
    pub total: usize,
    pub completed: usize,
    pub overdue: usize,
    pub upcoming: usize,
    pub completion_rate: f64,
}

impl GridSummary {
    /// False for grids without a single applicable cell; such grids have
    /// nothing to report and should not render a stat block.
    pub fn has_data(&self) -> bool {
        self.total > 0
    }

    fn add(&mut self, cell: &GridCell, today: Date) {
        if !cell.status.should_appear {
            return;
        }
        self.total += 1;
        if cell.status.is_completed {
            self.completed += 1;
        }
        if cell.status.is_overdue {
            self.overdue += 1;
        }
        if cell.status.is_upcoming(cell.date, today) {
            self.upcoming += 1;
        }
    }

    fn finish(mut self) -> Self {
        self.completion_rate = if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        };
        self
    }
}

impl Grid {
    pub fn row(&self, task_id: &str) -> Option<&GridRow> {
        self.rows.iter().find(|row| row.task_id == task_id)
    }

    pub fn cell(&self, task_id: &str, date: Date) -> Option<&GridCell> {
        self.row(task_id)?.cells.iter().find(|cell| cell.date == date)
    }

    pub fn row_summaries(&self) -> Vec<(String, GridSummary)> {
        self.rows
            .iter()
            .map(|row| {
                let mut summary = GridSummary::default();
                for cell in &row.cells {
                    summary.add(cell, self.today);
                }
                (row.task_id.clone(), summary.finish())
            })
            .collect()
    }
}

/// Resolves every (active task, date) cell. Rows keep the input order and
/// are built in parallel; cells dated before a task existed are inert.
pub fn build_grid<L>(
    tasks: &[TaskDefinition],
    range: DateRange,
    today: Date,
    completions: &L,
) -> Grid
where
    L: CompletionLookup,
{
    let rows = tasks
        .par_iter()
        .filter(|task| task.active)
        .map(|task| {
            let valid_from = task.valid_from();
            let cells = range
                .days()
                .map(|date| {
                    let status = if date < valid_from {
                        DerivedStatus::inert()
                    } else {
                        resolve(task, date, completions, today)
                    };
                    GridCell { date, status }
                })
                .collect();
            GridRow {
                task_id: task.id.clone(),
                task_name: task.name.clone(),
                area: task.area.clone(),
                cells,
            }
        })
        .collect();

    Grid { range, today, rows }
}

pub fn summarize(grid: &Grid) -> GridSummary {
    let mut summary = GridSummary::default();
    for cell in grid.rows.iter().flat_map(|row| row.cells.iter()) {
        summary.add(cell, grid.today);
    }
    summary.finish()
}

#[cfg(test)]
mod tests {
    use super::{DateRange, DateWindow, build_grid, summarize};
    use crate::ledger::LedgerSnapshot;
    use crate::model::{CompletionRecord, Frequency, TaskDefinition};
    use crate::status::CellState;
    use time::macros::{date, datetime};
    use time::{Date, Weekday};

    fn task(id: &str, frequency: Frequency, anchor: Date) -> TaskDefinition {
        TaskDefinition {
            id: id.to_string(),
            name: format!("clean {id}"),
            frequency,
            anchor_date: anchor,
            area: None,
            active: true,
            created_at: datetime!(2025-01-01 00:00 UTC),
            created_on: None,
            updated_at: datetime!(2025-01-01 00:00 UTC),
        }
    }

    fn done(id: &str, date: Date) -> CompletionRecord {
        CompletionRecord {
            task_id: id.to_string(),
            date,
            completed_at: datetime!(2025-03-01 12:00 UTC),
        }
    }

    #[test]
    fn windows_map_to_expected_ranges() {
        let today = date!(2025 - 03 - 05);
        assert_eq!(DateWindow::Today.range(today).len(), 1);
        assert_eq!(DateWindow::Next2Days.range(today).end(), date!(2025 - 03 - 07));
        assert_eq!(DateWindow::Week.range(today).end(), date!(2025 - 03 - 11));
        assert_eq!(DateWindow::All.range(today).end(), date!(2025 - 03 - 18));
        assert_eq!("next2days".parse::<DateWindow>().unwrap(), DateWindow::Next2Days);
        assert_eq!("WEEK".parse::<DateWindow>().unwrap(), DateWindow::Week);
        assert_eq!(
            "month".parse::<DateWindow>().unwrap_err().code(),
            "invalid_input"
        );
    }

    #[test]
    fn monday_task_over_fourteen_days_from_a_wednesday() {
        // 2025-03-05 is a Wednesday; the window holds Mondays 03-10 and 03-17.
        let tasks = vec![task(
            "mop",
            Frequency::Weekday(Weekday::Monday),
            date!(2025 - 01 - 01),
        )];
        let range = DateRange::fourteen_days_from(date!(2025 - 03 - 05));
        let today = date!(2025 - 03 - 25);

        let grid = build_grid(&tasks, range, today, &LedgerSnapshot::new());
        let active: Vec<_> = grid.rows[0]
            .cells
            .iter()
            .filter(|cell| cell.status.should_appear)
            .collect();

        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|cell| cell.status.state() == CellState::Overdue));

        let summary = summarize(&grid);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.overdue, 2);
        assert_eq!(summary.upcoming, 0);
    }

    #[test]
    fn summary_counts_upcoming_strictly_after_today() {
        let tasks = vec![task("wipe", Frequency::Daily, date!(2025 - 01 - 01))];
        let today = date!(2025 - 03 - 05);
        let range = DateRange::new(date!(2025 - 03 - 03), date!(2025 - 03 - 08)).unwrap();
        let snapshot: LedgerSnapshot = [
            done("wipe", date!(2025 - 03 - 03)),
            done("wipe", date!(2025 - 03 - 07)),
        ]
        .into_iter()
        .collect();

        let summary = summarize(&build_grid(&tasks, range, today, &snapshot));

        assert_eq!(summary.total, 6);
        assert_eq!(summary.completed, 2);
        // 03-04 is overdue; 03-05 is today and pending.
        assert_eq!(summary.overdue, 1);
        // 03-06 and 03-08; 03-07 is already done.
        assert_eq!(summary.upcoming, 2);
        assert!((summary.completion_rate - 2.0 / 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_task_list_has_zero_rate() {
        let grid = build_grid(
            &[],
            DateWindow::All.range(date!(2025 - 03 - 05)),
            date!(2025 - 03 - 05),
            &LedgerSnapshot::new(),
        );
        let summary = summarize(&grid);

        assert!(grid.rows.is_empty());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.completion_rate, 0.0);
        assert!(!summary.completion_rate.is_nan());
        assert!(!summary.has_data());
    }

    #[test]
    fn inactive_tasks_are_left_out_and_rows_keep_order() {
        let mut retired = task("fryer", Frequency::Daily, date!(2025 - 01 - 01));
        retired.active = false;
        let tasks = vec![
            task("b-hood", Frequency::Daily, date!(2025 - 01 - 01)),
            retired,
            task("a-floor", Frequency::Daily, date!(2025 - 01 - 01)),
        ];

        let grid = build_grid(
            &tasks,
            DateWindow::Today.range(date!(2025 - 03 - 05)),
            date!(2025 - 03 - 05),
            &LedgerSnapshot::new(),
        );
        let ids: Vec<&str> = grid.rows.iter().map(|row| row.task_id.as_str()).collect();

        assert_eq!(ids, vec!["b-hood", "a-floor"]);
    }

    #[test]
    fn cells_before_task_creation_are_inert() {
        let mut fresh = task("shelves", Frequency::Daily, date!(2025 - 03 - 04));
        fresh.created_at = datetime!(2025-03-04 15:00 UTC);
        let range = DateRange::new(date!(2025 - 03 - 02), date!(2025 - 03 - 05)).unwrap();

        let grid = build_grid(&[fresh], range, date!(2025 - 03 - 05), &LedgerSnapshot::new());

        assert!(!grid.cell("shelves", date!(2025 - 03 - 03)).unwrap().status.should_appear);
        assert!(grid.cell("shelves", date!(2025 - 03 - 04)).unwrap().status.is_overdue);
        assert_eq!(summarize(&grid).total, 2);
    }

    #[test]
    fn row_summaries_split_totals_per_task() {
        let tasks = vec![
            task("hood", Frequency::Daily, date!(2025 - 01 - 01)),
            task("drains", Frequency::every_n_days(3).unwrap(), date!(2025 - 03 - 01)),
        ];
        let snapshot: LedgerSnapshot =
            [done("drains", date!(2025 - 03 - 04))].into_iter().collect();
        let range = DateRange::new(date!(2025 - 03 - 01), date!(2025 - 03 - 09)).unwrap();

        let grid = build_grid(&tasks, range, date!(2025 - 03 - 05), &snapshot);
        let rows = grid.row_summaries();

        assert_eq!(rows[0].0, "hood");
        assert_eq!(rows[0].1.total, 9);
        assert_eq!(rows[1].0, "drains");
        // 03-01, 03-04, 03-07
        assert_eq!(rows[1].1.total, 3);
        assert_eq!(rows[1].1.completed, 1);
        assert_eq!(summarize(&grid).total, 12);
    }
}
