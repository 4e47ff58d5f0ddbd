use clap::{Parser, Subcommand};
use roster_core::config::ConfigOverrides;
use roster_core::grid::DateWindow;
use roster_core::model::{canonical_token, parse_iso_date};
use time::Date;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Treat this date as today (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", global = true, value_parser = parse_iso_date)]
    pub today: Option<Date>,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Define a recurring task
    ///
    /// Example: roster add "Degrease hood" --frequency weekly --area Kitchen
    /// Example: roster add "Clean drains" --frequency every_3_days --anchor 2025-03-01
    Add {
        name: String,
        #[arg(short, long)]
        frequency: String,
        #[arg(long)]
        area: Option<String>,
        /// First day of the cycle; defaults to today
        #[arg(long, value_name = "DATE", value_parser = parse_iso_date)]
        anchor: Option<Date>,
    },
    /// List task definitions
    ///
    /// Example: roster list --all --limit 10
    List {
        /// Include deactivated tasks
        #[arg(long)]
        all: bool,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = roster_core::roster_api::DEFAULT_PAGE_SIZE)]
        limit: usize,
    },
    /// Show a task definition
    ///
    /// Example: roster show task-1
    Show { id: String },
    /// Rename a task
    ///
    /// Example: roster rename task-1 "Degrease extractor hood"
    Rename { id: String, name: String },
    /// Set or clear a task's area
    ///
    /// Example: roster area task-1 Kitchen
    /// Example: roster area task-1
    Area { id: String, area: Option<String> },
    /// Change a task's frequency (only before it has completions)
    ///
    /// Example: roster frequency task-1 monthly
    Frequency { id: String, frequency: String },
    /// Hide a task from the roster, keeping its history
    ///
    /// Example: roster deactivate task-1
    Deactivate { id: String },
    /// Bring a deactivated task back
    ///
    /// Example: roster reactivate task-1
    Reactivate { id: String },
    /// Delete a task that has never been completed
    ///
    /// Example: roster delete task-1
    Delete { id: String },
    /// Mark a task done for a date
    ///
    /// Example: roster done task-1
    /// Example: roster done task-1 --date 2025-03-04
    Done {
        id: String,
        #[arg(long, value_name = "DATE", value_parser = parse_iso_date)]
        date: Option<Date>,
    },
    /// Clear a completion
    ///
    /// Example: roster undo task-1 --date 2025-03-04
    Undo {
        id: String,
        #[arg(long, value_name = "DATE", value_parser = parse_iso_date)]
        date: Option<Date>,
    },
    /// Flip a grid cell between done and not done
    ///
    /// Example: roster toggle task-1 --date 2025-03-04
    Toggle {
        id: String,
        #[arg(long, value_name = "DATE", value_parser = parse_iso_date)]
        date: Option<Date>,
    },
    /// Show the task by date grid
    ///
    /// Example: roster grid
    /// Example: roster grid --window week --from 2025-03-03
    Grid {
        #[arg(long)]
        window: Option<DateWindow>,
        #[arg(long, value_name = "DATE", value_parser = parse_iso_date)]
        from: Option<Date>,
    },
    /// Show completion statistics for a window
    ///
    /// Example: roster stats --window today
    Stats {
        #[arg(long)]
        window: Option<DateWindow>,
        #[arg(long, value_name = "DATE", value_parser = parse_iso_date)]
        from: Option<Date>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    DefaultWindow,
    LogFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let canonical_field = canonical_token(key_raw)
        .ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "theme" => ConfigOverrideTarget::Theme,
        "default_window" | "window" => ConfigOverrideTarget::DefaultWindow,
        "log_filter" | "log" => ConfigOverrideTarget::LogFilter,
        other => return Err(format!("unknown config field '{other}'")),
    };

    if target == ConfigOverrideTarget::DefaultWindow {
        value
            .parse::<DateWindow>()
            .map_err(|err| err.message().to_string())?;
    }

    Ok(ParsedConfigOverride { target, value })
}

/// Folds every `--config-override` argument into one set; later keys win.
pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for item in raw {
        let parsed = parse_config_override(item)?;
        let slot = match parsed.target {
            ConfigOverrideTarget::Theme => &mut overrides.theme,
            ConfigOverrideTarget::DefaultWindow => &mut overrides.default_window,
            ConfigOverrideTarget::LogFilter => &mut overrides.log_filter,
        };
        *slot = Some(parsed.value);
    }
    Ok(overrides)
}
