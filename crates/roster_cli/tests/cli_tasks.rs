use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("roster-{nanos}-{file_name}"))
}

fn write_store(path: &Path, tasks: serde_json::Value, completions: serde_json::Value) {
    let content = serde_json::json!({
        "schema_version": 1,
        "tasks": tasks,
        "completions": completions
    });
    std::fs::write(path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
}

fn read_store(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn roster(store_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_roster"))
        .args(args)
        .env("ROSTER_STORE_PATH", store_path)
        .env("ROSTER_CONFIG_PATH", store_path.with_extension("config.json"))
        .env_remove("ROSTER_LOG")
        .output()
        .expect("failed to run roster")
}

fn seeded_task(id: &str, frequency: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": format!("clean {id}"),
        "frequency": frequency,
        "anchor_date": "2025-03-01",
        "area": "Kitchen",
        "active": true,
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z"
    })
}

#[test]
fn add_command_writes_task_with_canonical_frequency() {
    let store_path = temp_path("cli-add.json");

    let output = roster(
        &store_path,
        &[
            "add",
            "Degrease hood",
            "--frequency",
            "Every 3 Days",
            "--area",
            "Kitchen",
            "--anchor",
            "2025-03-01",
            "--json",
        ],
    );
    assert!(output.status.success());

    let printed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let stored = read_store(&store_path);
    std::fs::remove_file(&store_path).ok();

    assert_eq!(printed["name"], "Degrease hood");
    assert_eq!(printed["frequency"], "every_3_days");
    assert_eq!(stored["schema_version"], 1);
    assert_eq!(stored["tasks"][0]["frequency"], "every_3_days");
    assert_eq!(stored["tasks"][0]["anchor_date"], "2025-03-01");
    assert_eq!(stored["tasks"][0]["area"], "Kitchen");
    assert_eq!(stored["tasks"][0]["active"], true);
}

#[test]
fn add_command_defaults_anchor_to_today_override() {
    let store_path = temp_path("cli-add-anchor.json");

    let output = roster(
        &store_path,
        &["add", "Mop floors", "-f", "weekly", "--today", "2025-03-05"],
    );
    let stored = read_store(&store_path);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Added task: Mop floors"));
    assert_eq!(stored["tasks"][0]["anchor_date"], "2025-03-05");
}

#[test]
fn add_command_rejects_unknown_frequency() {
    let store_path = temp_path("cli-add-bad.json");

    let output = roster(&store_path, &["add", "Clean vents", "--frequency", "sometimes"]);

    assert!(!output.status.success());
    assert!(!store_path.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_frequency"));
    assert!(stderr.contains("sometimes"));
}

#[test]
fn list_command_hides_inactive_unless_asked() {
    let store_path = temp_path("cli-list.json");
    let mut retired = seeded_task("task-2", "monthly");
    retired["active"] = serde_json::json!(false);
    write_store(
        &store_path,
        serde_json::json!([seeded_task("task-1", "monday"), retired]),
        serde_json::json!([]),
    );

    let active = roster(&store_path, &["list", "--json"]);
    let everything = roster(&store_path, &["list", "--all", "--json"]);
    let plain = roster(&store_path, &["list"]);
    std::fs::remove_file(&store_path).ok();

    let active: serde_json::Value = serde_json::from_slice(&active.stdout).unwrap();
    let everything: serde_json::Value = serde_json::from_slice(&everything.stdout).unwrap();
    assert_eq!(active["total"], 1);
    assert_eq!(active["items"][0]["id"], "task-1");
    assert_eq!(everything["total"], 2);

    let stdout = String::from_utf8_lossy(&plain.stdout);
    assert!(stdout.contains("task-1 | clean task-1 | monday | Kitchen"));
    assert!(!stdout.contains("task-2"));
}

#[test]
fn list_command_pages_results() {
    let store_path = temp_path("cli-list-page.json");
    write_store(
        &store_path,
        serde_json::json!([
            seeded_task("task-1", "daily"),
            seeded_task("task-2", "daily"),
            seeded_task("task-3", "daily")
        ]),
        serde_json::json!([]),
    );

    let output = roster(&store_path, &["list", "--offset", "1", "--limit", "1", "--json"]);
    std::fs::remove_file(&store_path).ok();

    let page: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(page["total"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["items"][0]["id"], "task-2");
}

#[test]
fn edit_commands_update_the_definition() {
    let store_path = temp_path("cli-edit.json");
    write_store(
        &store_path,
        serde_json::json!([seeded_task("task-1", "daily")]),
        serde_json::json!([]),
    );

    assert!(roster(&store_path, &["rename", "task-1", "Wipe counters"]).status.success());
    assert!(roster(&store_path, &["area", "task-1"]).status.success());
    assert!(roster(&store_path, &["frequency", "task-1", "every other day"]).status.success());
    assert!(roster(&store_path, &["deactivate", "task-1"]).status.success());
    let shown = roster(&store_path, &["show", "task-1", "--json"]);
    let stored = read_store(&store_path);
    std::fs::remove_file(&store_path).ok();

    let shown: serde_json::Value = serde_json::from_slice(&shown.stdout).unwrap();
    assert_eq!(shown["name"], "Wipe counters");
    assert_eq!(shown["frequency"], "every_other_day");
    assert_eq!(shown["area"], serde_json::Value::Null);
    assert_eq!(shown["active"], false);
    assert_eq!(stored["tasks"][0], shown);
}

#[test]
fn history_freezes_frequency_and_blocks_delete() {
    let store_path = temp_path("cli-history.json");
    write_store(
        &store_path,
        serde_json::json!([seeded_task("task-1", "daily")]),
        serde_json::json!([
            {
                "task_id": "task-1",
                "date": "2025-03-04",
                "completed_at": "2025-03-04T10:00:00Z"
            }
        ]),
    );

    let frequency = roster(&store_path, &["frequency", "task-1", "weekly"]);
    let delete = roster(&store_path, &["delete", "task-1"]);
    let stored = read_store(&store_path);
    std::fs::remove_file(&store_path).ok();

    assert!(!frequency.status.success());
    assert!(String::from_utf8_lossy(&frequency.stderr).contains("ERROR: invalid_input"));
    assert!(!delete.status.success());
    assert!(String::from_utf8_lossy(&delete.stderr).contains("deactivate it instead"));
    assert_eq!(stored["tasks"][0]["frequency"], "daily");
}

#[test]
fn delete_command_removes_unused_task() {
    let store_path = temp_path("cli-delete.json");
    write_store(
        &store_path,
        serde_json::json!([seeded_task("task-1", "daily"), seeded_task("task-2", "daily")]),
        serde_json::json!([]),
    );

    let output = roster(&store_path, &["delete", "task-1"]);
    let stored = read_store(&store_path);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Deleted task: clean task-1"));
    assert_eq!(stored["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(stored["tasks"][0]["id"], "task-2");
}

#[test]
fn show_command_rejects_unknown_id() {
    let store_path = temp_path("cli-show-missing.json");
    write_store(
        &store_path,
        serde_json::json!([seeded_task("task-1", "daily")]),
        serde_json::json!([]),
    );

    let output = roster(&store_path, &["show", "task-9"]);
    std::fs::remove_file(&store_path).ok();

    assert!(!output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stderr).trim(),
        "ERROR: invalid_input - task not found"
    );
}

#[test]
fn corrupt_store_is_reported_as_invalid_data() {
    let store_path = temp_path("cli-corrupt.json");
    std::fs::write(&store_path, "{ not json").unwrap();

    let output = roster(&store_path, &["list"]);
    std::fs::remove_file(&store_path).ok();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: invalid_data"));
}

#[test]
fn unknown_config_override_fails_fast() {
    let store_path = temp_path("cli-override.json");

    let output = roster(&store_path, &["list", "--config-override", "colour=red"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown config field 'colour'"));
}
