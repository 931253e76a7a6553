//! Typed failure taxonomy for an import run.
//!
//! Operations return [`anyhow::Result`] like the rest of the crate; a
//! [`LoadError`] sits at the root of the chain whenever the failure belongs to
//! one of the categories an operator needs to tell apart. Callers recover it
//! with `err.downcast_ref::<LoadError>()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// Missing input, absent header row, unusable settings. Raised before any insert.
    #[error("configuration error: {0}")]
    Config(String),
    /// No overlap between the CSV header and the declared target columns.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("database error: {0}")]
    Database(#[from] tiberius::error::Error),
}

impl LoadError {
    pub fn config(message: impl Into<String>) -> Self {
        LoadError::Config(message.into())
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        LoadError::SchemaMismatch(message.into())
    }
}
