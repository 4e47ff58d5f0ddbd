use crate::board::Board;
use crate::error::AppError;
use crate::grid::{Grid, GridSummary, summarize};
use crate::ledger::{CompletionLedger, LedgerSnapshot};
use crate::model::{CellKey, CompletionRecord, DateRange, Frequency, TaskDefinition};
use crate::storage::JsonLedger;
use crate::storage::json_store::{self, RosterState};
use serde::Serialize;
use std::path::Path;
use time::{Date, OffsetDateTime, UtcOffset};

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub offset: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub key: CellKey,
    /// The cell's record after the mutation; `None` once uncompleted.
    pub record: Option<CompletionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridReport {
    pub grid: Grid,
    pub summary: GridSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleReport {
    pub key: CellKey,
    pub completed: bool,
    /// Still waiting for the ledger to show the change.
    pub pending: bool,
}

pub fn today_local() -> Date {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc().to_offset(offset).date()
}

pub fn add_task(
    name: &str,
    frequency: &str,
    area: Option<&str>,
    anchor: Option<Date>,
) -> Result<TaskDefinition, AppError> {
    let path = json_store::store_path()?;
    add_task_with_path(&path, name, frequency, area, anchor)
}

pub fn get_task(id: &str) -> Result<TaskDefinition, AppError> {
    let path = json_store::store_path()?;
    get_task_with_path(&path, id)
}

pub fn list_tasks(
    page: PageRequest,
    include_inactive: bool,
) -> Result<Page<TaskDefinition>, AppError> {
    let path = json_store::store_path()?;
    list_tasks_with_path(&path, page, include_inactive)
}

pub fn rename_task(id: &str, name: &str) -> Result<TaskDefinition, AppError> {
    let path = json_store::store_path()?;
    rename_task_with_path(&path, id, name)
}

pub fn set_task_area(id: &str, area: Option<&str>) -> Result<TaskDefinition, AppError> {
    let path = json_store::store_path()?;
    set_task_area_with_path(&path, id, area)
}

pub fn change_frequency(id: &str, frequency: &str) -> Result<TaskDefinition, AppError> {
    let path = json_store::store_path()?;
    change_frequency_with_path(&path, id, frequency)
}

pub fn deactivate_task(id: &str) -> Result<TaskDefinition, AppError> {
    let path = json_store::store_path()?;
    set_active_with_path(&path, id, false)
}

pub fn reactivate_task(id: &str) -> Result<TaskDefinition, AppError> {
    let path = json_store::store_path()?;
    set_active_with_path(&path, id, true)
}

pub fn delete_task(id: &str) -> Result<TaskDefinition, AppError> {
    let path = json_store::store_path()?;
    delete_task_with_path(&path, id)
}

pub fn complete(id: &str, date: Date) -> Result<CompletionRecord, AppError> {
    let path = json_store::store_path()?;
    JsonLedger::new(path).complete(id, date)
}

pub fn uncomplete(id: &str, date: Date) -> Result<MutationOutcome, AppError> {
    let path = json_store::store_path()?;
    uncomplete_with_path(&path, id, date)
}

pub fn list_completions(task_ids: &[String], range: DateRange) -> Result<LedgerSnapshot, AppError> {
    let path = json_store::store_path()?;
    JsonLedger::new(path).list_completions(task_ids, range)
}

pub fn load_board(range: DateRange) -> Result<Board, AppError> {
    let path = json_store::store_path()?;
    load_board_with_path(&path, range)
}

pub fn roster_grid(range: DateRange, today: Date) -> Result<GridReport, AppError> {
    let path = json_store::store_path()?;
    roster_grid_with_path(&path, range, today)
}

pub fn toggle_cell(id: &str, date: Date) -> Result<ToggleReport, AppError> {
    let path = json_store::store_path()?;
    toggle_cell_with_path(&path, id, date)
}

fn add_task_with_path(
    path: &Path,
    name: &str,
    frequency: &str,
    area: Option<&str>,
    anchor: Option<Date>,
) -> Result<TaskDefinition, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("name is required"));
    }
    let frequency = Frequency::parse(frequency)?;

    let now = OffsetDateTime::now_utc();
    let today = today_local();
    let task = json_store::update_state(path, |state| {
        let mut stamp = now.unix_timestamp_nanos();
        while state.task(&format!("task-{stamp}")).is_some() {
            stamp += 1;
        }
        let task = TaskDefinition {
            id: format!("task-{stamp}"),
            name: trimmed.to_string(),
            frequency,
            anchor_date: anchor.unwrap_or(today),
            area: normalize_area(area),
            active: true,
            created_at: now,
            created_on: Some(today),
            updated_at: now,
        };
        state.tasks.push(task.clone());
        Ok((task, true))
    })?;
    tracing::debug!(task_id = %task.id, frequency = %task.frequency, "task added");

    Ok(task)
}

fn get_task_with_path(path: &Path, id: &str) -> Result<TaskDefinition, AppError> {
    let trimmed_id = required_id(id)?;
    let state = json_store::load_state(path)?;
    state
        .tasks
        .into_iter()
        .find(|task| task.id == trimmed_id)
        .ok_or_else(|| AppError::invalid_input("task not found"))
}

fn list_tasks_with_path(
    path: &Path,
    page: PageRequest,
    include_inactive: bool,
) -> Result<Page<TaskDefinition>, AppError> {
    if page.page_size == 0 {
        return Err(AppError::invalid_input("page size must be at least 1"));
    }

    let tasks: Vec<TaskDefinition> = json_store::load_state(path)?
        .tasks
        .into_iter()
        .filter(|task| include_inactive || task.active)
        .collect();
    let total = tasks.len();
    let items = tasks
        .into_iter()
        .skip(page.offset)
        .take(page.page_size)
        .collect();

    Ok(Page {
        items,
        total,
        offset: page.offset,
        page_size: page.page_size,
    })
}

fn rename_task_with_path(path: &Path, id: &str, name: &str) -> Result<TaskDefinition, AppError> {
    let trimmed_name = name.trim();
    if trimmed_name.is_empty() {
        return Err(AppError::invalid_input("name is required"));
    }
    modify_task_with_path(path, id, |task, _| {
        task.name = trimmed_name.to_string();
        Ok(())
    })
}

fn set_task_area_with_path(
    path: &Path,
    id: &str,
    area: Option<&str>,
) -> Result<TaskDefinition, AppError> {
    let area = normalize_area(area);
    modify_task_with_path(path, id, |task, _| {
        task.area = area;
        Ok(())
    })
}

fn change_frequency_with_path(
    path: &Path,
    id: &str,
    frequency: &str,
) -> Result<TaskDefinition, AppError> {
    let frequency = Frequency::parse(frequency)?;
    modify_task_with_path(path, id, |task, has_history| {
        if has_history && task.frequency != frequency {
            return Err(AppError::invalid_input(
                "frequency cannot change once the task has completions",
            ));
        }
        task.frequency = frequency;
        Ok(())
    })
}

fn set_active_with_path(path: &Path, id: &str, active: bool) -> Result<TaskDefinition, AppError> {
    modify_task_with_path(path, id, |task, _| {
        task.active = active;
        Ok(())
    })
}

fn delete_task_with_path(path: &Path, id: &str) -> Result<TaskDefinition, AppError> {
    let trimmed_id = required_id(id)?;
    json_store::update_state(path, |state| {
        let index = state
            .tasks
            .iter()
            .position(|task| task.id == trimmed_id)
            .ok_or_else(|| AppError::invalid_input("task not found"))?;
        if state.has_history(trimmed_id) {
            return Err(AppError::invalid_input(
                "task has completion history; deactivate it instead",
            ));
        }

        Ok((state.tasks.remove(index), true))
    })
}

fn modify_task_with_path(
    path: &Path,
    id: &str,
    update: impl FnOnce(&mut TaskDefinition, bool) -> Result<(), AppError>,
) -> Result<TaskDefinition, AppError> {
    let trimmed_id = required_id(id)?;
    json_store::update_state(path, |state| {
        let has_history = state.has_history(trimmed_id);
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.id == trimmed_id)
            .ok_or_else(|| AppError::invalid_input("task not found"))?;

        update(task, has_history)?;
        task.updated_at = OffsetDateTime::now_utc();
        Ok((task.clone(), true))
    })
}

fn uncomplete_with_path(path: &Path, id: &str, date: Date) -> Result<MutationOutcome, AppError> {
    let ledger = JsonLedger::new(path);
    ledger.uncomplete(id, date)?;
    Ok(MutationOutcome {
        key: CellKey::new(id.trim(), date),
        record: None,
    })
}

fn load_board_with_path(path: &Path, range: DateRange) -> Result<Board, AppError> {
    let RosterState { tasks, .. } = json_store::load_state(path)?;
    let tasks: Vec<TaskDefinition> = tasks.into_iter().filter(|task| task.active).collect();
    let mut board = Board::new(tasks, LedgerSnapshot::new());
    board.refresh(&JsonLedger::new(path), range)?;
    Ok(board)
}

fn roster_grid_with_path(path: &Path, range: DateRange, today: Date) -> Result<GridReport, AppError> {
    let board = load_board_with_path(path, range)?;
    let grid = board.grid(range, today);
    let summary = summarize(&grid);
    Ok(GridReport { grid, summary })
}

fn toggle_cell_with_path(path: &Path, id: &str, date: Date) -> Result<ToggleReport, AppError> {
    let range = DateRange::single(date);
    let ledger = JsonLedger::new(path);
    let mut board = load_board_with_path(path, range)?;

    let completed = board.toggle(&ledger, id, date)?;
    if let Err(err) = board.refresh(&ledger, range) {
        tracing::warn!(error = %err, "could not confirm toggle");
    }

    let key = CellKey::new(id.trim(), date);
    Ok(ToggleReport {
        pending: board.overlay().pending(&key).is_some(),
        key,
        completed,
    })
}

fn required_id(id: &str) -> Result<&str, AppError> {
    let trimmed_id = id.trim();
    if trimmed_id.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    Ok(trimmed_id)
}

fn normalize_area(area: Option<&str>) -> Option<String> {
    area.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
