//! Table and JSON output for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables and key/value lines
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
}

/// Print rows as a table, or as a JSON array.
pub fn print_list<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table if rows.is_empty() => println!("No results found."),
        OutputFormat::Table => println!("{}", Table::new(rows)),
        OutputFormat::Json => print_json(&rows),
    }
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => print_error(&format!("Failed to encode output: {e}")),
    }
}

pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}

/// Print an aligned `key: value` line.
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<20} {value}", format!("{key}:"));
}
