//! SQL Server destination backed by `tiberius`.
//!
//! The driver is async; [`MssqlDestination`] owns a current-thread runtime and
//! blocks on it for every call, so the import pipeline stays synchronous and
//! uses a single connection from a single thread.

use anyhow::{Context, Result};
use log::{debug, info};
use tiberius::{Client, Config, ToSql};
use tokio::{net::TcpStream, runtime::Runtime};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::{
    coerce::SqlValue,
    config::{TableRef, quote_ident},
    error::LoadError,
    loader::Destination,
    rows::InsertTuple,
};

/// SQL Server rejects more than 2100 parameters per request; stay below it.
pub const MAX_PARAMETERS_PER_STATEMENT: usize = 2000;
/// Row limit of a single `VALUES` table constructor.
pub const MAX_ROWS_PER_STATEMENT: usize = 1000;

static NULL_PARAMETER: Option<&'static str> = None;

/// `INSERT INTO <table> ([a], [b]) VALUES (@P1, @P2), (@P3, @P4)` for `row_count` rows.
pub fn build_insert_sql(table: &TableRef, columns: &[String], row_count: usize) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("INSERT INTO {} ({column_list}) VALUES ", table.qualified());
    let mut parameter = 0usize;
    for row in 0..row_count {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for col in 0..columns.len() {
            if col > 0 {
                sql.push_str(", ");
            }
            parameter += 1;
            sql.push_str(&format!("@P{parameter}"));
        }
        sql.push(')');
    }
    sql
}

/// Rows per statement so that neither the parameter nor the row limit is exceeded.
pub fn rows_per_statement(column_count: usize) -> usize {
    if column_count == 0 {
        return MAX_ROWS_PER_STATEMENT;
    }
    (MAX_PARAMETERS_PER_STATEMENT / column_count).clamp(1, MAX_ROWS_PER_STATEMENT)
}

/// Splits `rows` into statements that each fit in a single request, pairing
/// every group with its `INSERT` text. Parameter numbering restarts at `@P1`
/// in each statement.
pub fn insert_statements<'a>(
    table: &'a TableRef,
    columns: &'a [String],
    rows: &'a [InsertTuple],
) -> impl Iterator<Item = (String, &'a [InsertTuple])> + 'a {
    rows.chunks(rows_per_statement(columns.len()))
        .map(move |group| (build_insert_sql(table, columns, group.len()), group))
}

pub fn columns_query(table: &TableRef) -> String {
    format!(
        "SELECT COLUMN_NAME FROM {}.INFORMATION_SCHEMA.COLUMNS \
         WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2 ORDER BY ORDINAL_POSITION",
        quote_ident(&table.database)
    )
}

fn as_parameter(value: &SqlValue) -> &dyn ToSql {
    match value {
        SqlValue::Null => &NULL_PARAMETER,
        SqlValue::Integer(v) => v,
        SqlValue::Bit(v) => v,
        SqlValue::Text(v) => v,
        SqlValue::DateTime(v) => v,
    }
}

pub struct MssqlDestination {
    runtime: Runtime,
    client: Client<Compat<TcpStream>>,
}

impl MssqlDestination {
    pub fn connect(connection_string: &str) -> Result<Self> {
        let config = Config::from_ado_string(connection_string)
            .map_err(LoadError::from)
            .context("Parsing connection string")?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Starting database runtime")?;
        let addr = config.get_addr();
        debug!("Connecting to SQL Server at {addr}");
        let client = runtime.block_on(async {
            let tcp = TcpStream::connect(config.get_addr())
                .await
                .with_context(|| format!("Connecting to {addr}"))?;
            tcp.set_nodelay(true)?;
            let client = Client::connect(config, tcp.compat_write())
                .await
                .map_err(LoadError::from)?;
            anyhow::Ok(client)
        })?;
        info!("Connected to SQL Server at {addr}");
        Ok(Self { runtime, client })
    }

    fn batch(&mut self, sql: &str) -> Result<()> {
        let Self { runtime, client } = self;
        runtime.block_on(async {
            client
                .simple_query(sql)
                .await?
                .into_results()
                .await?;
            Ok::<_, tiberius::error::Error>(())
        })
        .map_err(LoadError::from)
        .with_context(|| format!("Executing '{sql}'"))
    }
}

impl Destination for MssqlDestination {
    fn table_columns(&mut self, table: &TableRef) -> Result<Vec<String>> {
        let sql = columns_query(table);
        let Self { runtime, client } = self;
        let rows = runtime
            .block_on(async {
                client
                    .query(sql.as_str(), &[&table.schema.as_str(), &table.table.as_str()])
                    .await?
                    .into_first_result()
                    .await
            })
            .map_err(LoadError::from)
            .with_context(|| format!("Reading column list of {table}"))?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get::<&str, _>(0).map(str::to_string))
            .collect())
    }

    fn truncate(&mut self, table: &TableRef) -> Result<()> {
        self.batch(&format!("TRUNCATE TABLE {};", table.qualified()))
    }

    fn begin(&mut self) -> Result<()> {
        self.batch("BEGIN TRANSACTION;")
    }

    fn insert_batch(
        &mut self,
        table: &TableRef,
        columns: &[String],
        rows: &[InsertTuple],
    ) -> Result<()> {
        let Self { runtime, client } = self;
        for (sql, group) in insert_statements(table, columns, rows) {
            let params = group
                .iter()
                .flat_map(|row| row.iter().map(as_parameter))
                .collect::<Vec<_>>();
            runtime
                .block_on(client.execute(sql.as_str(), &params))
                .map_err(LoadError::from)
                .with_context(|| format!("Inserting {} row(s) into {table}", group.len()))?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.batch("COMMIT TRANSACTION;")
    }

    fn rollback(&mut self) -> Result<()> {
        self.batch("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION;")
    }
}
