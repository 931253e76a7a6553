//! Column selection: turning a CSV header into the ordered insert plan.
//!
//! Two strategies implement [`ColumnSelector`]:
//!
//! - [`FixedSchemaSelector`] inserts into a target schema known in advance and
//!   refuses to run when nothing but the identifier would be inserted.
//! - [`DiscoveredSchemaSelector`] intersects the header with the live table's
//!   column list (ordinal order), renaming known synonym spellings first, and
//!   only warns about columns that do not line up.
//!
//! Both share [`HeaderMapper`] for name resolution and [`ColumnKinds`] for the
//! per-column coercion, and both put the generated identifier first.

use std::collections::HashMap;

use anyhow::Result;
use serde::Serialize;

use crate::{
    coerce::{Coercion, ColumnKinds},
    config::{LoadConfig, SynonymPair},
    error::LoadError,
    mapping::{AliasTable, HeaderMapper, HeaderMapping, normalize_header},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "index")]
pub enum ColumnSource {
    Generated,
    Field(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedColumn {
    pub name: String,
    pub source: ColumnSource,
    pub coercion: Coercion,
}

/// Ordered insert columns, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnPlan {
    columns: Vec<PlannedColumn>,
}

impl ColumnPlan {
    fn with_identifier(identifier: &str) -> Self {
        Self {
            columns: vec![PlannedColumn {
                name: identifier.to_string(),
                source: ColumnSource::Generated,
                coercion: Coercion::Identifier,
            }],
        }
    }

    fn push(&mut self, name: &str, source_index: usize, coercion: Coercion) {
        self.columns.push(PlannedColumn {
            name: name.to_string(),
            source: ColumnSource::Field(source_index),
            coercion,
        });
    }

    pub fn columns(&self) -> &[PlannedColumn] {
        &self.columns
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Number of columns fed from the CSV.
    pub fn data_column_count(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| matches!(c.source, ColumnSource::Field(_)))
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    pub plan: ColumnPlan,
    pub mapping: HeaderMapping,
    /// Target columns no CSV column maps to.
    pub missing_in_source: Vec<String>,
    /// CSV columns that map to no target column.
    pub ignored_in_source: Vec<String>,
}

pub trait ColumnSelector {
    fn select(&self, headers: &[String]) -> Result<Selection>;
}

#[derive(Debug, Clone)]
pub struct FixedSchemaSelector {
    identifier: String,
    target_columns: Vec<String>,
    timestamp_columns: Vec<String>,
    aliases: AliasTable,
    kinds: ColumnKinds,
}

impl FixedSchemaSelector {
    pub fn new(
        identifier: &str,
        target_columns: Vec<String>,
        timestamp_columns: Vec<String>,
        aliases: AliasTable,
        kinds: ColumnKinds,
    ) -> Self {
        Self {
            identifier: identifier.to_string(),
            target_columns,
            timestamp_columns,
            aliases,
            kinds,
        }
    }

    pub fn from_config(config: &LoadConfig) -> Self {
        Self::new(
            &config.identifier_column,
            config.target_columns.clone(),
            config.timestamp_columns.clone(),
            config.aliases.clone(),
            config.column_kinds(),
        )
    }
}

impl ColumnSelector for FixedSchemaSelector {
    fn select(&self, headers: &[String]) -> Result<Selection> {
        let mapper = HeaderMapper::new(
            &self.identifier,
            self.target_columns.iter().chain(self.timestamp_columns.iter()),
            self.aliases.clone(),
        );
        let mapping = mapper.map(headers)?;

        let mut plan = ColumnPlan::with_identifier(&self.identifier);
        let mut missing_in_source = Vec::new();
        let identifier = normalize_header(&self.identifier);
        let mut seen = vec![identifier];
        for column in self.target_columns.iter().chain(self.timestamp_columns.iter()) {
            let canonical = normalize_header(column);
            if seen.contains(&canonical) {
                continue;
            }
            seen.push(canonical.clone());
            match mapping.target_for(&canonical) {
                Some(mapped) => {
                    plan.push(&canonical, mapped.source_index, self.kinds.coercion_for(&canonical))
                }
                None if self.target_columns.contains(column) => missing_in_source.push(canonical),
                None => {}
            }
        }

        if plan.data_column_count() == 0 {
            return Err(LoadError::schema_mismatch(
                "No matching columns found between CSV and target table. \
                 Check header names or update the alias table.",
            )
            .into());
        }

        Ok(Selection {
            plan,
            ignored_in_source: mapping.ignored.clone(),
            mapping,
            missing_in_source,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveredSchemaSelector {
    identifier: String,
    table_columns: Vec<String>,
    aliases: AliasTable,
    synonyms: Vec<SynonymPair>,
    kinds: ColumnKinds,
}

impl DiscoveredSchemaSelector {
    /// `table_columns` as reported by the destination, in ordinal order.
    pub fn new(
        identifier: &str,
        table_columns: Vec<String>,
        aliases: AliasTable,
        synonyms: Vec<SynonymPair>,
        kinds: ColumnKinds,
    ) -> Self {
        Self {
            identifier: identifier.to_string(),
            table_columns,
            aliases,
            synonyms,
            kinds,
        }
    }

    pub fn from_config(config: &LoadConfig, table_columns: Vec<String>) -> Self {
        Self::new(
            &config.identifier_column,
            table_columns,
            config.aliases.clone(),
            config.synonyms.clone(),
            config.column_kinds(),
        )
    }

    /// Configured aliases plus one entry per synonym pair, pointing the
    /// undeclared spelling at the declared one.
    fn effective_aliases(&self, declared: &HashMap<String, &str>) -> AliasTable {
        let mut aliases = self.aliases.clone();
        for SynonymPair(left, right) in &self.synonyms {
            let (left, right) = (normalize_header(left), normalize_header(right));
            match (declared.contains_key(&left), declared.contains_key(&right)) {
                (true, false) => aliases.insert(&right, &left),
                (false, true) => aliases.insert(&left, &right),
                _ => {}
            }
        }
        aliases
    }
}

impl ColumnSelector for DiscoveredSchemaSelector {
    fn select(&self, headers: &[String]) -> Result<Selection> {
        let identifier = normalize_header(&self.identifier);
        // normalized name -> spelling declared by the destination
        let declared = self
            .table_columns
            .iter()
            .map(|name| (normalize_header(name), name.as_str()))
            .collect::<HashMap<_, _>>();

        let mapper = HeaderMapper::new(
            &self.identifier,
            declared.keys(),
            self.effective_aliases(&declared),
        );
        let mapping = mapper.map(headers)?;

        let mut plan = ColumnPlan::with_identifier(&self.identifier);
        let mut missing_in_source = Vec::new();
        let mut seen = vec![identifier.clone()];
        for column in &self.table_columns {
            let canonical = normalize_header(column);
            if seen.contains(&canonical) {
                continue;
            }
            seen.push(canonical.clone());
            match mapping.target_for(&canonical) {
                Some(mapped) => {
                    plan.push(column, mapped.source_index, self.kinds.coercion_for(&canonical))
                }
                None => missing_in_source.push(column.clone()),
            }
        }

        Ok(Selection {
            plan,
            ignored_in_source: mapping.ignored.clone(),
            mapping,
            missing_in_source,
        })
    }
}
