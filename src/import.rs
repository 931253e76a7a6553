//! End-to-end import: header → column plan → batched load.
//!
//! [`import_csv()`] is the testable core; it receives an already opened CSV
//! reader and a connection factory, and never opens a connection before the
//! header row has been read and, in fixed mode, the column plan settled.
//! [`execute()`] wires it to the CLI, the filesystem and SQL Server.

use std::io::Read;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    cli::LoadArgs,
    config::{LoadConfig, SchemaMode, TableRef},
    error::LoadError,
    io_utils,
    loader::{Destination, LoadSummary, load_rows},
    mssql::MssqlDestination,
    rows::InsertRows,
    selector::{ColumnSelector, DiscoveredSchemaSelector, FixedSchemaSelector, Selection},
};

pub fn execute(args: &LoadArgs) -> Result<()> {
    let config = args.resolve_config()?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let table = config.table_ref();
    info!("Importing CSV -> {table}");
    info!(
        "CSV: {} (delimiter '{}')",
        args.input.display(),
        io_utils::printable_delimiter(delimiter)
    );

    let mut reader = io_utils::open_csv_reader_from_path(&args.input, delimiter, encoding)?;
    let connection_string = config.resolved_connection_string();
    let summary = import_csv(&mut reader, &config, || {
        MssqlDestination::connect(&connection_string)
    })
    .with_context(|| format!("Importing {:?} into {table}", args.input))?;

    info!("Done. Inserted {} rows into {table}.", summary.rows);
    Ok(())
}

pub fn import_csv<R, D, F>(
    reader: &mut csv::Reader<R>,
    config: &LoadConfig,
    connect: F,
) -> Result<LoadSummary>
where
    R: Read,
    D: Destination,
    F: FnOnce() -> Result<D>,
{
    config.validate()?;
    let table = config.table_ref();
    let headers = io_utils::reader_headers(reader)?;
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LoadError::config("CSV appears to have no header row").into());
    }

    let (mut destination, selection) = match config.mode {
        SchemaMode::Fixed => {
            let selection = FixedSchemaSelector::from_config(config).select(&headers)?;
            (connect()?, selection)
        }
        SchemaMode::Discovered => {
            let mut destination = connect()?;
            let selection = discover_selection(&mut destination, &table, config, &headers)?;
            (destination, selection)
        }
    };
    report_selection(&selection, config.mode);

    if config.truncate_first {
        info!("Truncating target table...");
        destination.truncate(&table)?;
    }

    let columns = selection.plan.names();
    let rows = InsertRows::new(reader, &selection.plan);
    load_rows(&mut destination, &table, &columns, rows, config.batch_size)
}

fn discover_selection<D: Destination>(
    destination: &mut D,
    table: &TableRef,
    config: &LoadConfig,
    headers: &[String],
) -> Result<Selection> {
    let table_columns = destination.table_columns(table)?;
    if table_columns.is_empty() {
        return Err(LoadError::config(format!(
            "Table {table} was not found or has no columns"
        ))
        .into());
    }
    DiscoveredSchemaSelector::from_config(config, table_columns).select(headers)
}

fn report_selection(selection: &Selection, mode: SchemaMode) {
    let names = selection.plan.names();
    info!("Insert columns ({}): {:?}", names.len(), names);
    if selection.mapping.discarded_identifier {
        info!("CSV identifier column ignored; identifiers are generated");
    }
    match mode {
        SchemaMode::Discovered => {
            if !selection.missing_in_source.is_empty() {
                warn!(
                    "Table columns missing in CSV (will use NULL/default): {:?}",
                    selection.missing_in_source
                );
            }
            if !selection.ignored_in_source.is_empty() {
                warn!(
                    "CSV columns not in table (ignored): {:?}",
                    selection.ignored_in_source
                );
            }
            if selection.plan.data_column_count() == 0 {
                warn!("No CSV column matches the table; only identifiers will be inserted");
            }
        }
        SchemaMode::Fixed => {
            if !selection.ignored_in_source.is_empty() {
                info!(
                    "CSV columns without a target (ignored): {:?}",
                    selection.ignored_in_source
                );
            }
        }
    }
}
