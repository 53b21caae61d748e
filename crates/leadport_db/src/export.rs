//! Schema and table export to flat files.
//!
//! An export directory holds a byte-for-byte copy of the schema plus one CSV
//! per table. Rows are written in key order so a later restore loads them
//! deterministically.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::Row;
use tracing::{debug, error, info};

use crate::config::disconnect;
use crate::error::{DbError, DbResult};
use crate::layout::ExportLayout;
use crate::summary::{Outcome, RunKind, RunSummary};
use crate::tables::{quote_ident, TableOrder, TableSpec};

/// How a column's values are rendered into CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Date,
    Time,
    Timestamp,
    TimestampTz,
    /// Anything else; rendered by the server's own text output.
    Text,
}

impl ColumnKind {
    /// Classify an `information_schema.columns.data_type` value.
    pub fn from_data_type(data_type: &str) -> Self {
        match data_type {
            "date" => Self::Date,
            "time without time zone" => Self::Time,
            "timestamp without time zone" => Self::Timestamp,
            "timestamp with time zone" => Self::TimestampTz,
            _ => Self::Text,
        }
    }

    fn select_expr(self, column: &str) -> String {
        let ident = quote_ident(column);
        match self {
            Self::Text => format!("{ident}::text AS {ident}"),
            _ => ident,
        }
    }

    fn render(self, row: &PgRow, idx: usize) -> Result<Option<String>, sqlx::Error> {
        let value = match self {
            Self::Date => row.try_get::<Option<NaiveDate>, _>(idx)?.map(format_date),
            Self::Time => row.try_get::<Option<NaiveTime>, _>(idx)?.map(format_time),
            Self::Timestamp => row
                .try_get::<Option<NaiveDateTime>, _>(idx)?
                .map(format_timestamp),
            Self::TimestampTz => row
                .try_get::<Option<DateTime<Utc>>, _>(idx)?
                .map(format_timestamptz),
            Self::Text => row.try_get::<Option<String>, _>(idx)?,
        };
        Ok(value)
    }
}

pub fn format_date(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub fn format_time(value: NaiveTime) -> String {
    value.format("%H:%M:%S%.f").to_string()
}

pub fn format_timestamp(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

pub fn format_timestamptz(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S%.f%:z").to_string()
}

/// A column as discovered from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportColumn {
    pub name: String,
    pub kind: ColumnKind,
}

impl ExportColumn {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Look up a table's columns in ordinal order.
pub async fn table_columns(conn: &mut PgConnection, table: &str) -> DbResult<Vec<ExportColumn>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT column_name::text, data_type::text
        FROM information_schema.columns
        WHERE table_schema = current_schema() AND table_name = $1
        ORDER BY ordinal_position
        "#,
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, data_type)| ExportColumn::new(name, ColumnKind::from_data_type(&data_type)))
        .collect())
}

/// Build the full-table read for `table`, ordered by its key column.
pub fn select_statement(table: &TableSpec, columns: &[ExportColumn]) -> DbResult<String> {
    if columns.is_empty() {
        return Err(DbError::invalid_data(format!(
            "table '{}' not found or has no columns",
            table.name
        )));
    }
    if !columns.iter().any(|c| c.name == table.key_column) {
        return Err(DbError::invalid_data(format!(
            "table '{}' has no key column '{}'",
            table.name, table.key_column
        )));
    }

    let exprs: Vec<String> = columns.iter().map(|c| c.kind.select_expr(&c.name)).collect();
    Ok(format!(
        "SELECT {} FROM {} ORDER BY {} ASC",
        exprs.join(", "),
        quote_ident(table.name),
        quote_ident(table.key_column)
    ))
}

/// Serialize a header plus rows to CSV bytes. `None` becomes an empty field.
pub fn encode_csv<I>(columns: &[ExportColumn], rows: I) -> DbResult<Vec<u8>>
where
    I: IntoIterator<Item = Vec<Option<String>>>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns.iter().map(|c| c.name.as_str()))?;
    for row in rows {
        writer.write_record(row.iter().map(|v| v.as_deref().unwrap_or("")))?;
    }
    writer
        .into_inner()
        .map_err(|e| DbError::invalid_data(format!("failed to flush CSV buffer: {}", e.error())))
}

/// Exports the schema and every table in a [`TableOrder`].
///
/// Owns the session for the whole run and closes it when
/// [`export_all`](Self::export_all) returns.
pub struct Exporter {
    conn: PgConnection,
    layout: ExportLayout,
    tables: TableOrder,
}

impl Exporter {
    pub fn new(conn: PgConnection, layout: ExportLayout, tables: TableOrder) -> Self {
        Self {
            conn,
            layout,
            tables,
        }
    }

    /// Copy the schema source into the export directory.
    pub async fn export_schema(&self) -> DbResult<PathBuf> {
        info!("Exporting schema...");
        tokio::fs::create_dir_all(self.layout.export_dir()).await?;

        let source = &self.layout.schema_source;
        if !tokio::fs::try_exists(source).await? {
            return Err(DbError::schema_not_found(source));
        }

        let target = self.layout.exported_schema();
        tokio::fs::copy(source, &target).await?;
        info!(
            "Copied '{}' to '{}' successfully!",
            source.display(),
            target.display()
        );
        Ok(target)
    }

    /// Write every row of `table` to its CSV file. Returns the row count.
    pub async fn export_table(&mut self, table: &TableSpec) -> DbResult<u64> {
        info!("Exporting data from: '{}'", table.name);

        let columns = table_columns(&mut self.conn, table.name).await?;
        let statement = select_statement(table, &columns)?;
        debug!(table = table.name, %statement, "Reading table");

        let rows = sqlx::query(&statement).fetch_all(&mut self.conn).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let record = columns
                .iter()
                .enumerate()
                .map(|(idx, column)| column.kind.render(row, idx))
                .collect::<Result<Vec<_>, _>>()?;
            records.push(record);
        }

        let bytes = encode_csv(&columns, records)?;
        let path = self.layout.table_csv(table.name);
        tokio::fs::write(&path, bytes).await?;

        let count = rows.len() as u64;
        info!(table = table.name, rows = count, "Exported {} rows to '{}'", count, path.display());
        Ok(count)
    }

    /// Export the schema, then every table in order.
    ///
    /// A missing schema source is fatal. A failing table is logged, recorded
    /// in the summary, and the remaining tables still run.
    pub async fn export_all(mut self) -> DbResult<RunSummary> {
        info!("Starting database export...");
        let result = self.run().await;
        disconnect(self.conn).await;
        result
    }

    async fn run(&mut self) -> DbResult<RunSummary> {
        self.export_schema().await?;

        let mut summary = RunSummary::new(RunKind::Export);
        let tables: Vec<TableSpec> = self.tables.iter().copied().collect();
        for table in &tables {
            let outcome = match self.export_table(table).await {
                Ok(rows) => Outcome::Completed(rows),
                Err(e) => {
                    error!(table = table.name, "Export of '{}' failed: {}", table.name, e);
                    Outcome::Failed(e.to_string())
                }
            };
            summary.record_table(table.name, outcome);
        }

        info!(
            failures = summary.failure_count(),
            rows = summary.total_rows(),
            "Export finished"
        );
        Ok(summary)
    }
}
