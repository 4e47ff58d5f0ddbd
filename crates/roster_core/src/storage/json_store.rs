use crate::error::AppError;
use crate::ledger::{CompletionLedger, LedgerSnapshot, selects};
use crate::model::{CellKey, CompletionRecord, DateRange, TaskDefinition};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};
use time::{Date, OffsetDateTime};

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "roster.json";
const STORE_ENV_VAR: &str = "ROSTER_STORE_PATH";

// One lock per store file, shared by every handle in the process.
static STORE_LOCKS: LazyLock<DashMap<PathBuf, Arc<Mutex<()>>>> = LazyLock::new(DashMap::new);

#[derive(Debug, Serialize, Deserialize)]
struct StoredRoster {
    schema_version: u32,
    tasks: Vec<TaskDefinition>,
    #[serde(default)]
    completions: Vec<CompletionRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterState {
    pub tasks: Vec<TaskDefinition>,
    pub completions: Vec<CompletionRecord>,
}

impl RosterState {
    pub fn task(&self, id: &str) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn has_history(&self, task_id: &str) -> bool {
        self.completions
            .iter()
            .any(|record| record.task_id == task_id)
    }
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("roster").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("roster")
            .join(STORE_FILE_NAME))
    }
}

pub fn load_state(path: &Path) -> Result<RosterState, AppError> {
    if !path.exists() {
        return Ok(RosterState::default());
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let stored: StoredRoster =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if stored.schema_version != SCHEMA_VERSION {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    let mut task_ids = HashSet::new();
    for task in &stored.tasks {
        if !task_ids.insert(task.id.as_str()) {
            return Err(AppError::invalid_data(format!(
                "duplicate task id '{}'",
                task.id
            )));
        }
    }

    let mut cells = HashSet::new();
    for record in &stored.completions {
        if !task_ids.contains(record.task_id.as_str()) {
            return Err(AppError::invalid_data(format!(
                "completion references unknown task '{}'",
                record.task_id
            )));
        }
        if !cells.insert((record.task_id.as_str(), record.date)) {
            return Err(AppError::invalid_data(format!(
                "duplicate completion for '{}' on {}",
                record.task_id, record.date
            )));
        }
    }

    Ok(RosterState {
        tasks: stored.tasks,
        completions: stored.completions,
    })
}

/// Writes the whole roster to a sibling temp file, then renames it over
/// `path`, so readers see either the old or the new document. Concurrent
/// writers must go through [`update_state`].
pub fn save_state(path: &Path, state: &RosterState) -> Result<(), AppError> {
    let parent = parent_dir(path);
    std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;

    let mut completions = state.completions.clone();
    completions.sort_by(|left, right| left.key().cmp(&right.key()));
    let stored = StoredRoster {
        schema_version: SCHEMA_VERSION,
        tasks: state.tasks.clone(),
        completions,
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    let tmp_path = path.with_extension("json.tmp");
    let mut file = File::create(&tmp_path)
        .map_err(|err| AppError::io(format!("{}: {}", tmp_path.display(), err)))?;
    file.write_all(content.as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(|err| AppError::io(format!("{}: {}", tmp_path.display(), err)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        file.set_permissions(permissions)
            .map_err(|err| AppError::io(err.to_string()))?;
    }
    drop(file);

    std::fs::rename(&tmp_path, path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;

    Ok(())
}

/// Runs one load-modify-save cycle while holding both the in-process lock
/// for `path` and an OS lock on its `.lock` sibling. `update` returns the
/// caller's value and whether the state changed and must be written.
pub fn update_state<T>(
    path: &Path,
    update: impl FnOnce(&mut RosterState) -> Result<(T, bool), AppError>,
) -> Result<T, AppError> {
    let lock = STORE_LOCKS.entry(path.to_path_buf()).or_default().clone();
    let _guard = lock
        .lock()
        .map_err(|_| AppError::io("store lock poisoned"))?;
    let _file_lock = lock_store_file(path)?;

    let mut state = load_state(path)?;
    let (value, changed) = update(&mut state)?;
    if changed {
        save_state(path, &state)?;
    }
    Ok(value)
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

// Held until the returned handle is dropped.
fn lock_store_file(path: &Path) -> Result<File, AppError> {
    std::fs::create_dir_all(parent_dir(path)).map_err(|err| AppError::io(err.to_string()))?;
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|err| AppError::io(format!("{}: {}", lock_path.display(), err)))?;
    file.lock()
        .map_err(|err| AppError::io(format!("{}: {}", lock_path.display(), err)))?;
    Ok(file)
}

/// Completion ledger persisted in the roster file. Each mutation is one
/// [`update_state`] cycle, so handles on the same path never lose writes.
#[derive(Debug, Clone)]
pub struct JsonLedger {
    path: PathBuf,
}

impl JsonLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn with_state<T>(
        &self,
        update: impl FnOnce(&mut RosterState) -> Result<(T, bool), AppError>,
    ) -> Result<T, AppError> {
        update_state(&self.path, update)
    }
}

fn require_task(state: &RosterState, task_id: &str) -> Result<String, AppError> {
    let trimmed_id = task_id.trim();
    if trimmed_id.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    state
        .task(trimmed_id)
        .map(|task| task.id.clone())
        .ok_or_else(|| AppError::invalid_input("task not found"))
}

impl CompletionLedger for JsonLedger {
    fn complete(&self, task_id: &str, date: Date) -> Result<CompletionRecord, AppError> {
        self.with_state(|state| {
            let task_id = require_task(state, task_id)?;
            let key = CellKey::new(task_id.clone(), date);
            if let Some(existing) = state.completions.iter().find(|record| record.key() == key) {
                return Ok((existing.clone(), false));
            }

            let record = CompletionRecord {
                task_id,
                date,
                completed_at: OffsetDateTime::now_utc(),
            };
            tracing::debug!(task_id = %record.task_id, %date, "recording completion");
            state.completions.push(record.clone());
            Ok((record, true))
        })
    }

    fn uncomplete(&self, task_id: &str, date: Date) -> Result<(), AppError> {
        self.with_state(|state| {
            let task_id = require_task(state, task_id)?;
            let before = state.completions.len();
            state
                .completions
                .retain(|record| !(record.task_id == task_id && record.date == date));
            let changed = state.completions.len() != before;
            if changed {
                tracing::debug!(%task_id, %date, "removed completion");
            }
            Ok(((), changed))
        })
    }

    fn list_completions(
        &self,
        task_ids: &[String],
        range: DateRange,
    ) -> Result<LedgerSnapshot, AppError> {
        let state = load_state(&self.path)?;
        Ok(state
            .completions
            .into_iter()
            .filter(|record| selects(task_ids, &range, &record.key()))
            .collect())
    }
}
