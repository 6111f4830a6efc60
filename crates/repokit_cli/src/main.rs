//! Command-line reader over a SQLite table.
//!
//! # Responsibility
//! - Bind a generic repository to `<table>` and print matching rows as JSON.
//! - Turn `column=value` arguments into equality criteria.
//!
//! # Invariants
//! - Read-only: never issues writes against the database.

use repokit_core::db::open_db;
use repokit_core::{
    init_logging_with, CriteriaRepository, CrudRepository, EntityDescriptor, LoggingConfig,
    Record, SqliteRepository, Value, WhereEquals,
};
use std::process::ExitCode;

const USAGE: &str =
    "usage: repokit_cli <db-path> <table> [--page N] [--per-page N] [column=value ...]";
const LOG_DIR_ENV: &str = "REPOKIT_LOG_DIR";
const LOG_LEVEL_ENV: &str = "REPOKIT_LOG_LEVEL";

#[derive(Debug, PartialEq)]
struct Args {
    db_path: String,
    table: String,
    page: Option<u32>,
    per_page: Option<i64>,
    filters: Vec<(String, Value)>,
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    if let Some(config) = logging_from_env() {
        if let Err(message) = init_logging_with(&config) {
            eprintln!("logging disabled: {message}");
        }
    }

    match run(&args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            log::error!("event=cli_run module=cli status=error table={}", args.table);
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<String, Box<dyn std::error::Error>> {
    let conn = open_db(&args.db_path)?;
    let mut repo =
        SqliteRepository::<Record>::try_new(&conn, EntityDescriptor::new(args.table.as_str()))?;
    for (column, value) in &args.filters {
        repo.push_criteria(WhereEquals::new(column.as_str(), value.clone()));
    }

    let output = match (args.page, args.per_page) {
        (None, None) => serde_json::to_string_pretty(&repo.all(None)?)?,
        (page, per_page) => serde_json::to_string_pretty(&repo.paginate_at(
            per_page,
            page.unwrap_or(1),
            None,
        )?)?,
    };
    Ok(output)
}

/// File logging is opt-in through `REPOKIT_LOG_DIR`.
fn logging_from_env() -> Option<LoggingConfig> {
    logging_config(
        std::env::var(LOG_DIR_ENV).ok(),
        std::env::var(LOG_LEVEL_ENV).ok(),
    )
}

fn logging_config(log_dir: Option<String>, level: Option<String>) -> Option<LoggingConfig> {
    Some(LoggingConfig {
        level: level.unwrap_or_else(|| repokit_core::default_log_level().to_string()),
        log_dir: log_dir?,
    })
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut positional = Vec::new();
    let mut page = None;
    let mut per_page = None;
    let mut filters = Vec::new();

    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--page" => {
                let value = raw.next().ok_or("--page needs a value")?;
                page = Some(
                    value
                        .parse::<u32>()
                        .map_err(|_| format!("invalid page `{value}`"))?,
                );
            }
            "--per-page" => {
                let value = raw.next().ok_or("--per-page needs a value")?;
                per_page = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| format!("invalid per-page `{value}`"))?,
                );
            }
            _ if positional.len() < 2 => positional.push(arg),
            _ => {
                let (column, value) = arg
                    .split_once('=')
                    .ok_or_else(|| format!("expected column=value, got `{arg}`"))?;
                filters.push((column.to_string(), parse_value(value)));
            }
        }
    }

    let mut positional = positional.into_iter();
    let (Some(db_path), Some(table)) = (positional.next(), positional.next()) else {
        return Err("missing <db-path> or <table>".to_string());
    };
    Ok(Args {
        db_path,
        table,
        page,
        per_page,
        filters,
    })
}

/// `null`, integers and reals keep their type; anything else is text.
fn parse_value(raw: &str) -> Value {
    if raw == "null" {
        return Value::Null;
    }
    if let Ok(value) = raw.parse::<i64>() {
        return Value::Integer(value);
    }
    if let Ok(value) = raw.parse::<f64>() {
        return Value::Real(value);
    }
    Value::from(raw)
}
