//! QuillDB - CLI Client
//!
//! Usage: `quilldb-cli [connection string]`. Without an argument the CLI
//! connects to database `main` as the admin user.

use std::env;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::json;

use quilldb::storage::Value;
use quilldb::{EngineConfig, QueryResult, Registry, Session};

const DEFAULT_CONNECTION: &str = "Database=main;User ID=sa;Password=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Table,
    Json,
}

/// Print welcome banner
fn print_banner(session: &Session) {
    println!(
        r#"
  ___        _ _ _ ____  ____
 / _ \ _   _(_) | |  _ \| __ )
| | | | | | | | | | | | |  _ \
| |_| | |_| | | | | |_| | |_) |
 \__\_\\__,_|_|_|_|____/|____/

 An embeddable in-memory SQL engine
 Connected to '{}' as '{}'
 Type '.help' for help, '.quit' to exit
"#,
        session.database(),
        session.user()
    );
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help              Show this help message
  .quit              Exit QuillDB
  .tables            List all tables
  .schema [table]    Show table schema
  .mode table|json   Choose how results are printed

SQL Commands:
  CREATE TABLE ...   Create a new table
  CREATE INDEX ...   Create an index
  DROP TABLE ...     Drop a table
  INSERT INTO ...    Insert rows
  SELECT ...         Query data
  UPDATE ...         Update rows
  DELETE FROM ...    Delete rows
  BEGIN / COMMIT / ROLLBACK
  DECLARE @v INT; SET @v = ...

Examples:
  CREATE TABLE users (id INT IDENTITY PRIMARY KEY, name VARCHAR(100));
  INSERT INTO users (name) VALUES ('Alice'), ('Bob');
  SELECT * FROM users WHERE id = 1;
"#
    );
}

/// Format query results as a table
fn format_results(result: &QueryResult) -> String {
    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.name.len()).collect();
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.values().iter().map(|v| v.to_string()).collect())
        .collect();

    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| "-".repeat(*w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+\n", separator);

    let mut output = separator.clone();
    let header: String = result
        .columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!(" {:^width$} ", c.name, width = *w))
        .collect::<Vec<_>>()
        .join("|");
    output.push_str(&format!("|{}|\n", header));
    output.push_str(&separator);

    for row in &cells {
        let line: String = row
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {:>width$} ", v, width = *w))
            .collect::<Vec<_>>()
            .join("|");
        output.push_str(&format!("|{}|\n", line));
    }
    if !cells.is_empty() {
        output.push_str(&separator);
    }

    output.push_str(&format!("{} row(s) returned\n", cells.len()));
    output
}

fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bit(b) => json!(b),
        Value::Float(f) => json!(f),
        other => match other.as_i64() {
            Some(i) => json!(i),
            None => json!(other.to_text()),
        },
    }
}

/// Format query results as JSON, one object per row
fn format_json(result: &QueryResult) -> Result<String> {
    let rows: Vec<IndexMap<&str, serde_json::Value>> = result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .zip(row.values())
                .map(|(c, v)| (c.name.as_str(), json_value(v)))
                .collect()
        })
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

/// Execute a SQL batch
fn execute_sql(sql: &str, session: &mut Session, mode: OutputMode) -> Result<()> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Ok(());
    }

    let result = match session.execute(sql) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(());
        }
    };

    if let Some(message) = &result.error {
        eprintln!("Error {}: {}", result.error_code.unwrap_or_default(), message);
    } else if !result.columns.is_empty() {
        match mode {
            OutputMode::Table => print!("{}", format_results(&result)),
            OutputMode::Json => println!("{}", format_json(&result)?),
        }
    } else if result.update_count > 0 {
        println!("{} row(s) affected", result.update_count);
    }
    Ok(())
}

/// Handle special dot commands. Returns false when the CLI should exit.
fn handle_special_command(cmd: &str, session: &mut Session, mode: &mut OutputMode) -> bool {
    let parts: Vec<&str> = cmd.split_whitespace().collect();

    match parts.first().copied() {
        Some(".help") => print_help(),
        Some(".quit") | Some(".exit") => return false,
        Some(".tables") => match session.tables() {
            Ok(tables) if tables.is_empty() => println!("No tables found."),
            Ok(tables) => {
                println!("Tables:");
                for table in tables {
                    println!("  {}", table);
                }
            }
            Err(e) => eprintln!("Error: {}", e),
        },
        Some(".schema") => {
            let names = match parts.get(1) {
                Some(name) => vec![name.to_string()],
                None => session.tables().unwrap_or_default(),
            };
            for name in names {
                match session.describe_table(&name) {
                    Ok(info) => println!("{}", info),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
        }
        Some(".mode") => match parts.get(1).copied() {
            Some("table") => *mode = OutputMode::Table,
            Some("json") => *mode = OutputMode::Json,
            _ => eprintln!("Usage: .mode table|json"),
        },
        Some(cmd) => {
            eprintln!("Unknown command: {}", cmd);
            eprintln!("Type '.help' for available commands.");
        }
        None => {}
    }
    true
}

/// Main REPL loop
fn run_repl(session: &mut Session) -> Result<()> {
    let mut editor = DefaultEditor::new().context("failed to initialise line editor")?;
    let mut mode = OutputMode::Table;
    let mut input_buffer = String::new();

    print_banner(session);

    loop {
        let prompt = if input_buffer.is_empty() {
            "quilldb> "
        } else {
            "   ...> "
        };
        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                input_buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        };
        let trimmed = line.trim();

        if input_buffer.is_empty() && trimmed.starts_with('.') {
            let _ = editor.add_history_entry(trimmed);
            if !handle_special_command(trimmed, session, &mut mode) {
                break;
            }
            continue;
        }

        if trimmed.is_empty() {
            // an empty line runs an unterminated statement
            if !input_buffer.is_empty() {
                let sql = std::mem::take(&mut input_buffer);
                let _ = editor.add_history_entry(sql.trim());
                execute_sql(&sql, session, mode)?;
            }
            continue;
        }

        input_buffer.push_str(&line);
        input_buffer.push('\n');

        if trimmed.ends_with(';') {
            let sql = std::mem::take(&mut input_buffer);
            let _ = editor.add_history_entry(sql.trim());
            execute_sql(&sql, session, mode)?;
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let connection = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONNECTION.to_string());
    let registry = Registry::new(EngineConfig::default());
    let mut session = registry
        .connect(&connection)
        .with_context(|| format!("cannot connect with '{}'", connection))?;

    run_repl(&mut session)?;
    session.close();
    registry.shutdown();
    Ok(())
}
