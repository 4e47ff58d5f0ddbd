use clap::Parser;
use clap::error::ErrorKind;
use roster_cli::cli::{Cli, Command, collect_overrides};
use roster_core::config::{
    Config, Palette, load_config_with_fallback, merge_overrides, palette_for_theme,
};
use roster_core::error::AppError;
use roster_core::grid::{DateWindow, Grid, GridSummary};
use roster_core::model::{DateRange, TaskDefinition, format_iso_date};
use roster_core::roster_api::{self, PageRequest};
use roster_core::status::CellState;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;
use time::Date;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "ROSTER_LOG";

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .ok()
        .or_else(|| {
            config
                .log_filter
                .as_deref()
                .and_then(|directive| EnvFilter::try_new(directive).ok())
        })
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered =
        serde_json::to_string(value).map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn print_task_plain(task: &TaskDefinition) {
    let area = task.area.as_deref().unwrap_or("-");
    let active = if task.active { "active" } else { "inactive" };
    println!(
        "{} | {} | {} | {} | anchor {} | {}",
        task.id,
        task.name,
        task.frequency,
        area,
        format_iso_date(task.anchor_date),
        active
    );
}

fn day_label(date: Date) -> String {
    let weekday = date.weekday().to_string();
    format!(
        "{:02}-{:02} {}",
        u8::from(date.month()),
        date.day(),
        &weekday[..3]
    )
}

fn cell_symbol(state: CellState) -> &'static str {
    match state {
        CellState::NotApplicable => ".",
        CellState::Pending => "o",
        CellState::Overdue => "!",
        CellState::Completed => "x",
    }
}

fn print_grid_plain(grid: &Grid) {
    if grid.rows.is_empty() {
        println!("No active tasks.");
        return;
    }

    let mut builder = Builder::default();
    let mut header = vec!["task".to_string()];
    header.extend(grid.range.days().map(day_label));
    builder.push_record(header);

    for row in &grid.rows {
        let mut record = vec![row.task_name.clone()];
        record.extend(
            row.cells
                .iter()
                .map(|cell| cell_symbol(cell.status.state()).to_string()),
        );
        builder.push_record(record);
    }

    let mut table = builder.build();
    table.with(Style::modern());
    println!("{table}");
}

fn print_summary_plain(summary: &GridSummary, palette: &Palette) {
    if !summary.has_data() {
        println!("Nothing scheduled in this window.");
        return;
    }

    let overdue = format!("{} overdue", summary.overdue);
    let overdue = if summary.overdue > 0 {
        palette.accentize(&overdue)
    } else {
        palette.mutedize(&overdue)
    };
    println!(
        "{}/{} done ({:.0}%) | {} | {} upcoming",
        summary.completed,
        summary.total,
        summary.completion_rate * 100.0,
        overdue,
        summary.upcoming
    );
}

fn window_range(
    window: Option<DateWindow>,
    from: Option<Date>,
    config: &Config,
    today: Date,
) -> DateRange {
    window
        .unwrap_or_else(|| config.window())
        .range(from.unwrap_or(today))
}

fn run_command(cli: Cli, config: &Config, today: Date) -> Result<(), AppError> {
    let palette = palette_for_theme(config.theme.as_deref());

    match cli.command {
        Command::Add {
            name,
            frequency,
            area,
            anchor,
        } => {
            let anchor = anchor.unwrap_or(today);
            let task = roster_api::add_task(&name, &frequency, area.as_deref(), Some(anchor))?;
            if cli.json {
                print_json(&task)?;
            } else {
                println!("Added task: {} ({}) {}", task.name, task.id, task.frequency);
            }
        }
        Command::List { all, offset, limit } => {
            let page = roster_api::list_tasks(
                PageRequest {
                    offset,
                    page_size: limit,
                },
                all,
            )?;
            if cli.json {
                print_json(&page)?;
            } else {
                for task in &page.items {
                    print_task_plain(task);
                }
                let shown_end = page.offset + page.items.len();
                if page.total > shown_end || page.offset > 0 {
                    println!(
                        "{}",
                        palette.mutedize(&format!(
                            "showing {}-{} of {}",
                            page.offset.min(page.total),
                            shown_end,
                            page.total
                        ))
                    );
                }
            }
        }
        Command::Show { id } => {
            let task = roster_api::get_task(&id)?;
            if cli.json {
                print_json(&task)?;
            } else {
                print_task_plain(&task);
            }
        }
        Command::Rename { id, name } => {
            let task = roster_api::rename_task(&id, &name)?;
            if cli.json {
                print_json(&task)?;
            } else {
                println!("Renamed task: {} ({})", task.name, task.id);
            }
        }
        Command::Area { id, area } => {
            let task = roster_api::set_task_area(&id, area.as_deref())?;
            if cli.json {
                print_json(&task)?;
            } else {
                let area = task.area.as_deref().unwrap_or("-");
                println!("Updated area: {} ({}) {}", task.name, task.id, area);
            }
        }
        Command::Frequency { id, frequency } => {
            let task = roster_api::change_frequency(&id, &frequency)?;
            if cli.json {
                print_json(&task)?;
            } else {
                println!(
                    "Updated frequency: {} ({}) {}",
                    task.name, task.id, task.frequency
                );
            }
        }
        Command::Deactivate { id } => {
            let task = roster_api::deactivate_task(&id)?;
            if cli.json {
                print_json(&task)?;
            } else {
                println!("Deactivated task: {} ({})", task.name, task.id);
            }
        }
        Command::Reactivate { id } => {
            let task = roster_api::reactivate_task(&id)?;
            if cli.json {
                print_json(&task)?;
            } else {
                println!("Reactivated task: {} ({})", task.name, task.id);
            }
        }
        Command::Delete { id } => {
            let task = roster_api::delete_task(&id)?;
            if cli.json {
                print_json(&task)?;
            } else {
                println!("Deleted task: {} ({})", task.name, task.id);
            }
        }
        Command::Done { id, date } => {
            let record = roster_api::complete(&id, date.unwrap_or(today))?;
            if cli.json {
                print_json(&record)?;
            } else {
                println!(
                    "Completed: {} on {}",
                    record.task_id,
                    format_iso_date(record.date)
                );
            }
        }
        Command::Undo { id, date } => {
            let outcome = roster_api::uncomplete(&id, date.unwrap_or(today))?;
            if cli.json {
                print_json(&outcome)?;
            } else {
                println!(
                    "Cleared: {} on {}",
                    outcome.key.task_id,
                    format_iso_date(outcome.key.date)
                );
            }
        }
        Command::Toggle { id, date } => {
            let report = roster_api::toggle_cell(&id, date.unwrap_or(today))?;
            if cli.json {
                print_json(&report)?;
            } else {
                let state = if report.completed { "done" } else { "not done" };
                let pending = if report.pending { " (unconfirmed)" } else { "" };
                println!(
                    "{} on {}: {}{}",
                    report.key.task_id,
                    format_iso_date(report.key.date),
                    state,
                    pending
                );
            }
        }
        Command::Grid { window, from } => {
            let range = window_range(window, from, config, today);
            let report = roster_api::roster_grid(range, today)?;
            if cli.json {
                print_json(&report)?;
            } else {
                print_grid_plain(&report.grid);
                print_summary_plain(&report.summary, &palette);
            }
        }
        Command::Stats { window, from } => {
            let range = window_range(window, from, config, today);
            let report = roster_api::roster_grid(range, today)?;
            if cli.json {
                let rows: Vec<_> = report
                    .grid
                    .row_summaries()
                    .into_iter()
                    .map(|(task_id, summary)| {
                        serde_json::json!({ "task_id": task_id, "summary": summary })
                    })
                    .collect();
                print_json(&serde_json::json!({
                    "range": report.grid.range,
                    "summary": report.summary,
                    "tasks": rows,
                }))?;
            } else {
                println!(
                    "{} to {}",
                    format_iso_date(range.start()),
                    format_iso_date(range.end())
                );
                print_summary_plain(&report.summary, &palette);
            }
        }
    }

    Ok(())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let overrides = match collect_overrides(&cli.config_override) {
        Ok(overrides) => overrides,
        Err(message) => {
            eprintln!("ERROR: {}", AppError::invalid_input(message));
            std::process::exit(1);
        }
    };
    let loaded = load_config_with_fallback();
    let config = merge_overrides(&loaded.config, &overrides);

    init_tracing(&config);
    if let Some(err) = loaded.error {
        tracing::warn!(error = %err, "could not load config, using defaults");
    }

    let today = cli.today.unwrap_or_else(roster_api::today_local);
    if let Err(err) = run_command(cli, &config, today) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
