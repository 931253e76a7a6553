//! Header mapping from CSV column names onto canonical table columns.
//!
//! Source names are normalized (trimmed, lower-cased) before any comparison.
//! A source column resolves to a canonical column either by identity or
//! through the [`AliasTable`]; everything else is ignored. The identifier
//! column is never taken from the source.

use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Legacy or alternate source name to canonical column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: &str, canonical: &str) {
        self.entries
            .insert(normalize_header(alias), normalize_header(canonical));
    }

    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.entries.get(&normalize_header(alias)).map(String::as_str)
    }
}

impl From<BTreeMap<String, String>> for AliasTable {
    fn from(entries: BTreeMap<String, String>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<AliasTable> for BTreeMap<String, String> {
    fn from(table: AliasTable) -> Self {
        table.entries
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for AliasTable {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut table = AliasTable::new();
        for (alias, canonical) in iter {
            table.insert(alias.as_ref(), canonical.as_ref());
        }
        table
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Identity,
    Alias,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedColumn {
    /// Position of the field in each CSV record.
    pub source_index: usize,
    /// Normalized source header.
    pub source: String,
    /// Canonical (normalized) target column.
    pub target: String,
    pub matched_by: MatchKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderMapping {
    pub columns: Vec<MappedColumn>,
    /// Normalized source headers that did not map to anything.
    pub ignored: Vec<String>,
    /// Whether a source identifier column was seen and discarded.
    pub discarded_identifier: bool,
}

impl HeaderMapping {
    pub fn target_for(&self, canonical: &str) -> Option<&MappedColumn> {
        let canonical = normalize_header(canonical);
        self.columns.iter().find(|c| c.target == canonical)
    }

    pub fn targets(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.target.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct HeaderMapper {
    identifier: String,
    known: HashSet<String>,
    aliases: AliasTable,
}

impl HeaderMapper {
    /// `known` lists every canonical column a source column may map to,
    /// timestamp columns included.
    pub fn new<I, S>(identifier: &str, known: I, aliases: AliasTable) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let identifier = normalize_header(identifier);
        let known = known
            .into_iter()
            .map(|name| normalize_header(name.as_ref()))
            .filter(|name| *name != identifier)
            .collect();
        Self {
            identifier,
            known,
            aliases,
        }
    }

    pub fn map(&self, headers: &[String]) -> Result<HeaderMapping> {
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(LoadError::config("CSV appears to have no header row").into());
        }
        let normalized = headers
            .iter()
            .map(|h| normalize_header(h))
            .collect::<Vec<_>>();

        let mut resolved: Vec<Option<(String, MatchKind)>> = vec![None; normalized.len()];
        let mut claimed: HashSet<String> = HashSet::new();
        let mut mapping = HeaderMapping::default();

        // Identity matches claim their column before any alias can.
        for (idx, name) in normalized.iter().enumerate() {
            if *name == self.identifier {
                mapping.discarded_identifier = true;
                continue;
            }
            if self.known.contains(name) {
                if claimed.insert(name.clone()) {
                    resolved[idx] = Some((name.clone(), MatchKind::Identity));
                } else {
                    warn!("Duplicate CSV column '{name}' ignored");
                }
            }
        }
        for (idx, name) in normalized.iter().enumerate() {
            if resolved[idx].is_some() || *name == self.identifier || self.known.contains(name) {
                continue;
            }
            let Some(canonical) = self.aliases.resolve(name) else {
                continue;
            };
            if canonical == self.identifier || !self.known.contains(canonical) {
                debug!("Alias '{name}' -> '{canonical}' targets an unknown column");
                continue;
            }
            if claimed.insert(canonical.to_string()) {
                resolved[idx] = Some((canonical.to_string(), MatchKind::Alias));
            } else {
                warn!("CSV column '{name}' ignored: '{canonical}' is already mapped");
            }
        }

        for (idx, name) in normalized.into_iter().enumerate() {
            match resolved[idx].take() {
                Some((target, matched_by)) => mapping.columns.push(MappedColumn {
                    source_index: idx,
                    source: name,
                    target,
                    matched_by,
                }),
                None if name == self.identifier => {}
                None => mapping.ignored.push(name),
            }
        }
        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn identity_claims_before_alias_regardless_of_order() {
        let aliases = AliasTable::from_iter([("productseg", "productseq")]);
        let mapper = HeaderMapper::new("id", ["productseq"], aliases);
        let mapping = mapper
            .map(&headers(&["productseg", "productseq"]))
            .expect("map");
        assert_eq!(mapping.columns.len(), 1);
        assert_eq!(mapping.columns[0].source_index, 1);
        assert_eq!(mapping.ignored, vec!["productseg".to_string()]);
    }

    #[test]
    fn alias_to_unknown_column_is_ignored() {
        let aliases = AliasTable::from_iter([("descr", "description")]);
        let mapper = HeaderMapper::new("id", ["gtin"], aliases);
        let mapping = mapper.map(&headers(&["descr", "gtin"])).expect("map");
        assert_eq!(mapping.targets(), vec!["gtin"]);
        assert_eq!(mapping.ignored, vec!["descr".to_string()]);
    }
}
