use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    config::{LoadConfig, SchemaMode, TableRef},
    io_utils::parse_delimiter,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Map, coerce and bulk-load CSV exports into SQL Server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load a CSV file into the destination table
    Load(LoadArgs),
    /// Show how a CSV header maps onto the configured target columns
    Plan(PlanArgs),
    /// Print the default configuration as YAML
    DefaultConfig(DefaultConfigArgs),
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Input CSV file ('-' reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML configuration file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// SQL Server host (optionally host,port or host\instance)
    #[arg(long)]
    pub server: Option<String>,
    #[arg(long)]
    pub database: Option<String>,
    #[arg(long)]
    pub schema: Option<String>,
    /// Destination table as `table`, `schema.table` or `database.schema.table`
    #[arg(long)]
    pub table: Option<String>,
    /// Full ADO.NET connection string (overrides --server/--database for the connection)
    #[arg(long = "connection-string")]
    pub connection_string: Option<String>,
    /// Empty the destination table before loading
    #[arg(long)]
    pub truncate: bool,
    /// Rows per insert batch
    #[arg(long = "batch-size")]
    pub batch_size: Option<usize>,
    /// Where the list of target columns comes from
    #[arg(long, value_enum)]
    pub mode: Option<SchemaMode>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

impl LoadArgs {
    /// Configuration file (or defaults) with command-line flags applied on top.
    pub fn resolve_config(&self) -> Result<LoadConfig> {
        let mut config = load_config(self.config.as_ref())?;
        if let Some(server) = &self.server {
            config.server = server.clone();
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(schema) = &self.schema {
            config.schema = schema.clone();
        }
        if let Some(table) = &self.table {
            let parsed = TableRef::parse(table, &config.table_ref())?;
            config.database = parsed.database;
            config.schema = parsed.schema;
            config.table = parsed.table;
        }
        if let Some(connection_string) = &self.connection_string {
            config.connection_string = Some(connection_string.clone());
        }
        if self.truncate {
            config.truncate_first = true;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Input CSV file ('-' reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML configuration file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    #[arg(long, value_enum, default_value = "table")]
    pub format: PlanFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum PlanFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct DefaultConfigArgs {
    /// Write to this file instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

pub(crate) fn load_config(path: Option<&PathBuf>) -> Result<LoadConfig> {
    match path {
        Some(path) => {
            LoadConfig::load(path).with_context(|| format!("Loading configuration from {path:?}"))
        }
        None => Ok(LoadConfig::default()),
    }
}
