//! Insert tuple construction from CSV records.
//!
//! Provides [`build_insert_tuple()`] which reads each planned column's source
//! field out of a record and coerces it, and [`InsertRows`], the lazy
//! iterator the loader consumes.

use std::io::Read;

use anyhow::{Context, Result};
use csv::StringRecord;

use crate::{
    coerce::SqlValue,
    selector::{ColumnPlan, ColumnSource},
};

/// One fully mapped, coerced row in plan order.
pub type InsertTuple = Vec<SqlValue>;

pub fn build_insert_tuple(plan: &ColumnPlan, record: &StringRecord) -> InsertTuple {
    plan.columns()
        .iter()
        .map(|column| {
            let raw = match column.source {
                ColumnSource::Generated => None,
                // Short records read missing trailing fields as empty.
                ColumnSource::Field(idx) => record.get(idx),
            };
            column.coercion.apply(raw)
        })
        .collect()
}

/// Lazily turns the remaining records of a reader into insert tuples.
pub struct InsertRows<'a, R: Read> {
    records: csv::StringRecordsIter<'a, R>,
    plan: &'a ColumnPlan,
    // 1-based, header row included
    line: usize,
}

impl<'a, R: Read> InsertRows<'a, R> {
    pub fn new(reader: &'a mut csv::Reader<R>, plan: &'a ColumnPlan) -> Self {
        Self {
            records: reader.records(),
            plan,
            line: 1,
        }
    }
}

impl<R: Read> Iterator for InsertRows<'_, R> {
    type Item = Result<InsertTuple>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.line += 1;
        let line = self.line;
        Some(
            record
                .with_context(|| format!("Reading CSV row {line}"))
                .map(|record| build_insert_tuple(self.plan, &record)),
        )
    }
}
