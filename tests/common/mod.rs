#![allow(dead_code)]

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use csv_bulkload::config::TableRef;
use csv_bulkload::loader::Destination;
use csv_bulkload::rows::InsertTuple;
use encoding_rs::UTF_8;
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

pub fn csv_reader(contents: &str) -> csv::Reader<Box<dyn Read>> {
    csv_bulkload::io_utils::open_csv_reader(Cursor::new(contents.as_bytes().to_vec()), b',', UTF_8)
}

pub fn csv_reader_from_bytes(contents: &[u8]) -> csv::Reader<Box<dyn Read>> {
    csv_bulkload::io_utils::open_csv_reader(Cursor::new(contents.to_vec()), b',', UTF_8)
}

pub fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    TableColumns,
    Truncate,
    Begin,
    Insert(usize),
    Commit,
    Rollback,
}

/// In-memory destination recording every call it receives.
#[derive(Debug, Default)]
pub struct RecordingDestination {
    pub events: Vec<Event>,
    pub table_columns: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<InsertTuple>,
    /// Zero-based index of the insert call that fails.
    pub fail_on_batch: Option<usize>,
    pub batches_seen: usize,
}

impl RecordingDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table_columns(columns: &[&str]) -> Self {
        Self {
            table_columns: headers(columns),
            ..Self::default()
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Insert(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    pub fn committed(&self) -> bool {
        self.events.contains(&Event::Commit)
    }
}

impl Destination for RecordingDestination {
    fn table_columns(&mut self, _table: &TableRef) -> Result<Vec<String>> {
        self.events.push(Event::TableColumns);
        Ok(self.table_columns.clone())
    }

    fn truncate(&mut self, _table: &TableRef) -> Result<()> {
        self.events.push(Event::Truncate);
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        self.events.push(Event::Begin);
        Ok(())
    }

    fn insert_batch(
        &mut self,
        _table: &TableRef,
        columns: &[String],
        rows: &[InsertTuple],
    ) -> Result<()> {
        let batch = self.batches_seen;
        self.batches_seen += 1;
        if self.fail_on_batch == Some(batch) {
            return Err(anyhow!("constraint violation in batch {batch}"));
        }
        self.events.push(Event::Insert(rows.len()));
        self.columns = columns.to_vec();
        self.rows.extend_from_slice(rows);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.events.push(Event::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.events.push(Event::Rollback);
        Ok(())
    }
}

/// Connection factory handing out a borrowed destination, so the test can
/// inspect it after the import returns.
pub fn connect_to<'a>(
    destination: &'a mut RecordingDestination,
) -> impl FnOnce() -> Result<&'a mut RecordingDestination> + 'a {
    move || Ok(destination)
}
