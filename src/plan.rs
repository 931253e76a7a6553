//! Offline column plan report.
//!
//! Runs the fixed-schema selection against a CSV header and prints the
//! result, either as an aligned text table or as JSON, without opening a
//! database connection.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{
    cli::{PlanArgs, PlanFormat, load_config},
    coerce::Coercion,
    io_utils,
    mapping::MatchKind,
    selector::{ColumnSelector, ColumnSource, FixedSchemaSelector, Selection},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanRow {
    pub position: usize,
    pub column: String,
    /// Raw CSV header feeding the column; `None` for generated values.
    pub source: Option<String>,
    pub matched_by: Option<MatchKind>,
    pub coercion: Coercion,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub columns: Vec<PlanRow>,
    pub missing_in_source: Vec<String>,
    pub ignored_in_source: Vec<String>,
}

impl PlanReport {
    pub fn new(selection: &Selection, headers: &[String]) -> Self {
        let columns = selection
            .plan
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let (source, matched_by) = match column.source {
                    ColumnSource::Generated => (None, None),
                    ColumnSource::Field(field) => (
                        headers.get(field).cloned(),
                        selection
                            .mapping
                            .columns
                            .iter()
                            .find(|m| m.source_index == field)
                            .map(|m| m.matched_by),
                    ),
                };
                PlanRow {
                    position: idx + 1,
                    column: column.name.clone(),
                    source,
                    matched_by,
                    coercion: column.coercion,
                }
            })
            .collect();
        Self {
            columns,
            missing_in_source: selection.missing_in_source.clone(),
            ignored_in_source: selection.ignored_in_source.clone(),
        }
    }

    pub fn render_text(&self) -> String {
        let headers = ["#", "column", "source", "coercion"];
        let rows = self
            .columns
            .iter()
            .map(|row| {
                let source = match (&row.source, row.matched_by) {
                    (None, _) => "(generated)".to_string(),
                    (Some(name), Some(MatchKind::Alias)) => format!("{name} (alias)"),
                    (Some(name), _) => name.clone(),
                };
                [
                    row.position.to_string(),
                    row.column.clone(),
                    source,
                    row.coercion.to_string(),
                ]
            })
            .collect::<Vec<_>>();

        let mut widths = headers.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut output = String::new();
        push_line(&mut output, &headers, &widths);
        push_line(&mut output, &widths.map(|w| "-".repeat(w)), &widths);
        for row in &rows {
            push_line(&mut output, row, &widths);
        }
        if !self.missing_in_source.is_empty() {
            let _ = writeln!(output, "\nnot in CSV: {}", self.missing_in_source.join(", "));
        }
        if !self.ignored_in_source.is_empty() {
            let _ = writeln!(output, "ignored: {}", self.ignored_in_source.join(", "));
        }
        output
    }
}

fn push_line<S: AsRef<str>>(output: &mut String, cells: &[S], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{:<width$}", cell.as_ref()))
        .collect::<Vec<_>>()
        .join("  ");
    let _ = writeln!(output, "{}", line.trim_end());
}

pub fn execute(args: &PlanArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let mut reader = io_utils::open_csv_reader_from_path(&args.input, delimiter, encoding)?;
    let headers = io_utils::reader_headers(&mut reader)?;
    let selection = FixedSchemaSelector::from_config(&config)
        .select(&headers)
        .with_context(|| format!("Planning columns for {:?}", args.input))?;
    let report = PlanReport::new(&selection, &headers);
    match args.format {
        PlanFormat::Table => print!("{}", report.render_text()),
        PlanFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Serializing plan to JSON")?
        ),
    }
    info!(
        "Planned {} column(s) for {}",
        report.columns.len(),
        config.table_ref()
    );
    Ok(())
}
