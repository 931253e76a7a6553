//! Batched loading of insert tuples into a [`Destination`].
//!
//! The whole run shares one transaction: rows are grouped into fixed-size
//! chunks, each chunk becomes one `insert_batch` call, and the transaction
//! commits only after the last chunk succeeds. Any failure rolls back and the
//! original error is returned.

use anyhow::Result;
use itertools::Itertools;
use log::{info, warn};

use crate::{config::TableRef, rows::InsertTuple};

/// Target of an import. Implementations own the connection and release it on drop.
pub trait Destination {
    /// Column names of `table` in ordinal order; empty when the table does not exist.
    fn table_columns(&mut self, table: &TableRef) -> Result<Vec<String>>;

    /// Empties `table`. Runs and commits outside the load transaction.
    fn truncate(&mut self, table: &TableRef) -> Result<()>;

    fn begin(&mut self) -> Result<()>;

    /// Inserts every tuple of `rows`; each tuple matches `columns` in arity and order.
    fn insert_batch(
        &mut self,
        table: &TableRef,
        columns: &[String],
        rows: &[InsertTuple],
    ) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}

impl<D: Destination + ?Sized> Destination for &mut D {
    fn table_columns(&mut self, table: &TableRef) -> Result<Vec<String>> {
        (**self).table_columns(table)
    }

    fn truncate(&mut self, table: &TableRef) -> Result<()> {
        (**self).truncate(table)
    }

    fn begin(&mut self) -> Result<()> {
        (**self).begin()
    }

    fn insert_batch(
        &mut self,
        table: &TableRef,
        columns: &[String],
        rows: &[InsertTuple],
    ) -> Result<()> {
        (**self).insert_batch(table, columns, rows)
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<()> {
        (**self).rollback()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows: u64,
    pub batches: usize,
}

pub fn load_rows<D, I>(
    destination: &mut D,
    table: &TableRef,
    columns: &[String],
    rows: I,
    batch_size: usize,
) -> Result<LoadSummary>
where
    D: Destination + ?Sized,
    I: IntoIterator<Item = Result<InsertTuple>>,
{
    destination.begin()?;
    match insert_chunks(destination, table, columns, rows, batch_size.max(1)) {
        Ok(summary) => {
            destination.commit()?;
            Ok(summary)
        }
        Err(err) => {
            if let Err(rollback_err) = destination.rollback() {
                warn!("Rollback after failed load also failed: {rollback_err:#}");
            }
            Err(err)
        }
    }
}

fn insert_chunks<D, I>(
    destination: &mut D,
    table: &TableRef,
    columns: &[String],
    rows: I,
    batch_size: usize,
) -> Result<LoadSummary>
where
    D: Destination + ?Sized,
    I: IntoIterator<Item = Result<InsertTuple>>,
{
    let mut summary = LoadSummary::default();
    let chunks = rows.into_iter().chunks(batch_size);
    for chunk in &chunks {
        let batch = chunk.collect::<Result<Vec<_>>>()?;
        destination.insert_batch(table, columns, &batch)?;
        summary.rows += batch.len() as u64;
        summary.batches += 1;
        info!("Inserted {} rows...", summary.rows);
    }
    Ok(summary)
}
