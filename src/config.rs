//! Run configuration for an import.
//!
//! [`LoadConfig`] gathers everything that would otherwise be hard-coded in a
//! one-off script: where the table lives, how the connection is made, how CSV
//! headers map onto columns and how columns are typed. It loads from YAML
//! (every field optional, defaults describe the `labeling_products` table)
//! and the CLI layers explicit flags on top.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{coerce::ColumnKinds, error::LoadError, mapping::AliasTable};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum SchemaMode {
    /// Insert into the configured target columns.
    #[default]
    Fixed,
    /// Read the destination's column list from INFORMATION_SCHEMA.
    Discovered,
}

/// Two spellings of the same column; whichever one the destination declares wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymPair(pub String, pub String);

/// `[database].[schema].[table]` address of the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(database: &str, schema: &str, table: &str) -> Self {
        Self {
            database: database.to_string(),
            schema: schema.to_string(),
            table: table.to_string(),
        }
    }

    /// Accepts `table`, `schema.table` or `database.schema.table`, falling back
    /// to `default` for the missing leading parts.
    pub fn parse(value: &str, default: &TableRef) -> Result<Self> {
        let parts = value
            .split('.')
            .map(|part| part.trim().trim_start_matches('[').trim_end_matches(']'))
            .collect::<Vec<_>>();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(LoadError::config(format!("Invalid table reference '{value}'")).into());
        }
        match parts.as_slice() {
            [table] => Ok(Self::new(&default.database, &default.schema, table)),
            [schema, table] => Ok(Self::new(&default.database, schema, table)),
            [database, schema, table] => Ok(Self::new(database, schema, table)),
            _ => Err(LoadError::config(format!("Invalid table reference '{value}'")).into()),
        }
    }

    pub fn qualified(&self) -> String {
        format!(
            "{}.{}.{}",
            quote_ident(&self.database),
            quote_ident(&self.schema),
            quote_ident(&self.table)
        )
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.qualified())
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    pub server: String,
    pub database: String,
    pub schema: String,
    pub table: String,
    /// Full ADO.NET connection string; overrides `server`/`database` for the connection.
    pub connection_string: Option<String>,
    pub truncate_first: bool,
    pub batch_size: usize,
    pub mode: SchemaMode,
    pub identifier_column: String,
    /// Target schema in insert order (fixed mode).
    pub target_columns: Vec<String>,
    /// Included only when the CSV carries them explicitly.
    pub timestamp_columns: Vec<String>,
    pub integer_columns: Vec<String>,
    pub bit_columns: Vec<String>,
    pub aliases: AliasTable,
    /// Discovered mode only.
    pub synonyms: Vec<SynonymPair>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            database: "DM02".to_string(),
            schema: "dbo".to_string(),
            table: "labeling_products".to_string(),
            connection_string: None,
            truncate_first: false,
            batch_size: DEFAULT_BATCH_SIZE,
            mode: SchemaMode::Fixed,
            identifier_column: "id".to_string(),
            target_columns: strings(&[
                "product_idx",
                "product_seq",
                "inactive",
                "description",
                "company_prefix",
                "item_reference",
                "indicator_digit",
                "external_upc",
                "external_plu",
                "gtin",
                "company_name",
            ]),
            timestamp_columns: strings(&["created_at", "updated_at"]),
            integer_columns: strings(&[
                "product_idx",
                "product_seq",
                "productidx",
                "productseq",
                "productseg",
                "listidx",
            ]),
            bit_columns: strings(&["inactive"]),
            aliases: AliasTable::from_iter([
                ("productidx", "product_idx"),
                ("productseq", "product_seq"),
                ("productseg", "product_seq"),
                ("inactiveflag", "inactive"),
                ("descr", "description"),
                ("casecompanyprefix", "company_prefix"),
                ("caseitemreference", "item_reference"),
                ("caseindicatordigit", "indicator_digit"),
                ("externalupc", "external_upc"),
                ("externalplu", "external_plu"),
                ("ascompanyname", "company_name"),
            ]),
            synonyms: vec![SynonymPair("productseq".to_string(), "productseg".to_string())],
        }
    }
}

impl LoadConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: LoadConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config YAML {path:?}"))?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing config to YAML")
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(LoadError::config("batch_size must be greater than zero").into());
        }
        for (field, value) in [
            ("database", &self.database),
            ("schema", &self.schema),
            ("table", &self.table),
            ("identifier_column", &self.identifier_column),
        ] {
            if value.trim().is_empty() {
                return Err(LoadError::config(format!("{field} must not be empty")).into());
            }
        }
        if self.connection_string.is_none() && self.server.trim().is_empty() {
            return Err(
                LoadError::config("either server or connection_string must be set").into(),
            );
        }
        if self.mode == SchemaMode::Fixed && self.target_columns.is_empty() {
            return Err(
                LoadError::config("target_columns must not be empty in fixed mode").into(),
            );
        }
        Ok(())
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.database, &self.schema, &self.table)
    }

    pub fn column_kinds(&self) -> ColumnKinds {
        ColumnKinds::new(
            &self.identifier_column,
            &self.integer_columns,
            &self.bit_columns,
            &self.timestamp_columns,
        )
    }

    /// Trusted-connection string used when none is configured.
    pub fn resolved_connection_string(&self) -> String {
        match &self.connection_string {
            Some(value) => value.clone(),
            None => format!(
                "server=tcp:{};database={};IntegratedSecurity=true;TrustServerCertificate=true",
                self.server, self.database
            ),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
