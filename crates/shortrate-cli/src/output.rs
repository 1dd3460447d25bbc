//! Output formatting utilities.

use colored::Colorize;
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

use crate::cli::OutputFormat;
use crate::config::AppConfig;

/// Default number of decimals for printed values.
pub const DEFAULT_PRECISION: usize = 6;

/// Resolved output settings shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    /// Output format.
    pub format: OutputFormat,
    /// Decimals for printed values.
    pub precision: usize,
    /// Suppress headers and notices.
    pub quiet: bool,
}

impl OutputOptions {
    /// Combines the command-line format with the config file.
    pub fn resolve(format: Option<OutputFormat>, quiet: bool, config: &AppConfig) -> Self {
        Self {
            format: format.or(config.output.format).unwrap_or_default(),
            precision: config.output.precision.unwrap_or(DEFAULT_PRECISION),
            quiet,
        }
    }

    /// Formats a value with the configured precision.
    pub fn number(&self, value: f64) -> String {
        format!("{:.prec$}", value, prec = self.precision)
    }

    /// Formats a decimal rate as a percentage.
    pub fn percent(&self, rate: f64) -> String {
        format!("{:.prec$}%", rate * 100.0, prec = self.precision.saturating_sub(2))
    }

    /// Prints a section header unless quiet.
    pub fn header(&self, title: &str) {
        if !self.quiet {
            print_header(title);
        }
    }
}

/// Formats and prints output based on the specified format.
pub fn print_output<T: Serialize + Tabled>(data: &[T], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => print_table(data),
        OutputFormat::Json => print_json(data),
        OutputFormat::Csv => print_csv(data),
        OutputFormat::Minimal => print_minimal(data),
    }
}

/// Prints data as a formatted table.
fn print_table<T: Tabled>(data: &[T]) -> anyhow::Result<()> {
    if data.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let table = Table::new(data)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::left()))
        .to_string();

    println!("{}", table);
    Ok(())
}

/// Prints data as JSON.
fn print_json<T: Serialize>(data: &[T]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Prints data as CSV.
fn print_csv<T: Serialize>(data: &[T]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for item in data {
        wtr.serialize(item)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Prints minimal output (first value only).
fn print_minimal<T: Serialize>(data: &[T]) -> anyhow::Result<()> {
    if let Some(first) = data.first() {
        println!("{}", serde_json::to_string(first)?);
    }
    Ok(())
}

/// Prints a triangular lattice with one row per state and one column per
/// time step.
///
/// `columns[t]` holds `t + 1` values; cells below the diagonal stay blank.
pub fn print_lattice(columns: &[Vec<f64>], cell: impl Fn(f64) -> String) {
    let mut builder = Builder::default();
    builder.push_record(
        std::iter::once("i \\ t".to_string()).chain((0..columns.len()).map(|t| t.to_string())),
    );
    for state in 0..columns.len() {
        let row = columns
            .iter()
            .map(|column| column.get(state).map(|&v| cell(v)).unwrap_or_default());
        builder.push_record(std::iter::once(state.to_string()).chain(row));
    }
    println!("{}", builder.build().with(Style::rounded()));
}

/// Writes a lattice as `t,i,value` CSV rows.
pub fn print_lattice_csv(columns: &[Vec<f64>]) -> anyhow::Result<()> {
    #[derive(Serialize)]
    struct Node {
        t: usize,
        i: usize,
        value: f64,
    }

    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for (t, column) in columns.iter().enumerate() {
        for (i, &value) in column.iter().enumerate() {
            wtr.serialize(Node { t, i, value })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Prints a warning message.
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message);
}

/// Prints a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// A key-value pair for display.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct KeyValue {
    #[tabled(rename = "Metric")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl KeyValue {
    /// Creates a new key-value pair.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Prints a header for a section.
pub fn print_header(title: &str) {
    println!("\n{}", title.bold().underline());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_flag_over_config() {
        let mut config = AppConfig::default();
        config.output.format = Some(OutputFormat::Csv);
        config.output.precision = Some(3);

        let from_config = OutputOptions::resolve(None, false, &config);
        assert_eq!(from_config.format, OutputFormat::Csv);
        assert_eq!(from_config.number(1.23456), "1.235");

        let from_flag = OutputOptions::resolve(Some(OutputFormat::Json), false, &config);
        assert_eq!(from_flag.format, OutputFormat::Json);
    }

    #[test]
    fn test_defaults() {
        let options = OutputOptions::resolve(None, false, &AppConfig::default());
        assert_eq!(options.format, OutputFormat::Table);
        assert_eq!(options.number(0.5), "0.500000");
        assert_eq!(options.percent(0.045), "4.5000%");
    }
}
