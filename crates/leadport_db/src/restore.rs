//! Restoring an export into a database.
//!
//! Restore is more forgiving than export: a table with no CSV is skipped, and
//! a table whose load fails is rolled back on its own so earlier committed
//! tables stay intact.

use std::path::Path;

use sqlx::postgres::PgConnection;
use sqlx::Connection;
use tracing::{debug, error, info, warn};

use crate::config::disconnect;
use crate::error::{DbError, DbResult};
use crate::layout::ExportLayout;
use crate::schema::apply_schema;
use crate::sequences::adjust_sequences;
use crate::summary::{Outcome, RunKind, RunSummary};
use crate::tables::{quote_ident, TableOrder, TableSpec};

/// A CSV file re-encoded for `COPY ... FROM STDIN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPayload {
    /// Column names from the header row, in file order.
    pub columns: Vec<String>,
    /// Data records without the header. Empty fields are unquoted, which
    /// `COPY` in CSV mode reads as NULL. A single-column NULL is an empty line.
    pub body: Vec<u8>,
    pub rows: u64,
}

impl CopyPayload {
    /// Parse an exported CSV file.
    ///
    /// Every record must have as many fields as the header. Empty fields,
    /// quoted or not, come out as NULL.
    pub fn from_csv(bytes: &[u8]) -> DbResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if columns.is_empty() || columns.iter().any(|c| c.is_empty()) {
            return Err(DbError::invalid_data("CSV header is missing or has blank column names"));
        }

        if columns.len() == 1 {
            return Self::single_column(columns, reader);
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        let mut rows = 0u64;
        for record in reader.records() {
            let record = record?;
            writer.write_record(record.iter())?;
            rows += 1;
        }

        let body = writer.into_inner().map_err(|e| {
            DbError::invalid_data(format!("failed to flush CSV buffer: {}", e.error()))
        })?;

        Ok(Self {
            columns,
            body,
            rows,
        })
    }

    /// The csv writer renders a record holding one empty field as `""`, which
    /// `COPY` loads as an empty string. Single-column bodies are written by
    /// hand instead: an empty line for NULL, every other value quoted.
    fn single_column(columns: Vec<String>, mut reader: csv::Reader<&[u8]>) -> DbResult<Self> {
        let mut body = Vec::new();
        let mut rows = 0u64;
        for record in reader.records() {
            let record = record?;
            let value = record.get(0).unwrap_or("");
            if !value.is_empty() {
                body.push(b'"');
                body.extend_from_slice(value.replace('"', "\"\"").as_bytes());
                body.push(b'"');
            }
            body.push(b'\n');
            rows += 1;
        }

        Ok(Self {
            columns,
            body,
            rows,
        })
    }

    /// The `COPY` statement that loads this payload into `table`.
    pub fn copy_statement(&self, table: &str) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| quote_ident(c)).collect();
        format!(
            "COPY {} ({}) FROM STDIN WITH (FORMAT csv, NULL '')",
            quote_ident(table),
            columns.join(", ")
        )
    }
}

/// Restores the schema and every table in a [`TableOrder`], then repairs
/// sequences.
///
/// Owns the session for the whole run and closes it when
/// [`restore_all`](Self::restore_all) returns.
pub struct Restorer {
    conn: PgConnection,
    layout: ExportLayout,
    tables: TableOrder,
}

impl Restorer {
    pub fn new(conn: PgConnection, layout: ExportLayout, tables: TableOrder) -> Self {
        Self {
            conn,
            layout,
            tables,
        }
    }

    /// Apply the exported schema file in one transaction.
    pub async fn restore_schema(&mut self) -> DbResult<()> {
        info!("Restoring schema...");
        let path = self.layout.exported_schema();
        if !tokio::fs::try_exists(&path).await? {
            error!(
                "Schema file not found: '{}'. Please run export first.",
                path.display()
            );
            return Err(DbError::schema_not_found(path));
        }

        apply_schema(&mut self.conn, &path).await?;
        info!("Schema restored successfully.");
        Ok(())
    }

    /// Bulk-load one table from its CSV file.
    ///
    /// Never returns an error: a missing file becomes
    /// [`Outcome::Skipped`] and anything else that goes wrong becomes
    /// [`Outcome::Failed`] after the table's transaction is rolled back.
    pub async fn restore_table(&mut self, table: &TableSpec) -> Outcome<u64> {
        info!("Restoring data to: '{}'", table.name);
        let path = self.layout.table_csv(table.name);

        match tokio::fs::try_exists(&path).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    table = table.name,
                    "CSV file not found for '{}': '{}'. Data cannot be restored for this table.",
                    table.name,
                    path.display()
                );
                return Outcome::Skipped(format!("{} not found", path.display()));
            }
            Err(e) => return Outcome::Failed(e.to_string()),
        }

        match self.load_table(table, &path).await {
            Ok(rows) => {
                info!(table = table.name, rows, "Restored {} rows to '{}'", rows, table.name);
                Outcome::Completed(rows)
            }
            Err(e) => {
                error!(
                    table = table.name,
                    "Data restore for '{}' failed: {}", table.name, e
                );
                Outcome::Failed(e.to_string())
            }
        }
    }

    async fn load_table(&mut self, table: &TableSpec, path: &Path) -> DbResult<u64> {
        let bytes = tokio::fs::read(path).await?;
        let payload = CopyPayload::from_csv(&bytes)?;
        let statement = payload.copy_statement(table.name);
        debug!(table = table.name, %statement, rows = payload.rows, "Loading table");

        let mut tx = self.conn.begin().await?;
        match copy_in(&mut *tx, &statement, &payload.body).await {
            Ok(rows) => {
                tx.commit().await?;
                Ok(rows)
            }
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    warn!(table = table.name, "Rollback failed: {}", rb);
                }
                Err(e)
            }
        }
    }

    /// Restore the schema, every table in order, then sequences.
    ///
    /// A missing or failing schema is fatal. Table and sequence failures are
    /// recorded in the summary and the run carries on.
    pub async fn restore_all(mut self) -> DbResult<RunSummary> {
        info!("Starting database restore...");
        let result = self.run().await;
        disconnect(self.conn).await;
        result
    }

    async fn run(&mut self) -> DbResult<RunSummary> {
        self.restore_schema().await?;

        let mut summary = RunSummary::new(RunKind::Restore);
        let tables: Vec<TableSpec> = self.tables.iter().copied().collect();
        for table in &tables {
            let outcome = self.restore_table(table).await;
            summary.record_table(table.name, outcome);
        }

        for report in adjust_sequences(&mut self.conn, &self.tables).await {
            summary.record_sequence(report.table, report.outcome);
        }

        info!(
            failures = summary.failure_count(),
            rows = summary.total_rows(),
            "Restore finished"
        );
        Ok(summary)
    }
}

/// Stream `body` into a `COPY ... FROM STDIN` statement.
async fn copy_in(conn: &mut PgConnection, statement: &str, body: &[u8]) -> DbResult<u64> {
    let mut copy = conn.copy_in_raw(statement).await?;
    if !body.is_empty() {
        let sent = copy.send(body).await.map(|_| ());
        if let Err(e) = sent {
            if let Err(abort) = copy.abort(e.to_string()).await {
                debug!("COPY abort reported: {}", abort);
            }
            return Err(e.into());
        }
    }
    Ok(copy.finish().await?)
}
