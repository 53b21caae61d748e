//! Sequence repair after a bulk load.
//!
//! `COPY` writes explicit key values and never advances the sequence behind a
//! serial column, so without this step the next application insert would
//! reuse key 1.

use sqlx::postgres::PgConnection;
use sqlx::Connection;
use tracing::{error, info};

use crate::error::DbResult;
use crate::summary::{ItemReport, Outcome};
use crate::tables::{quote_ident, TableOrder, TableSpec};

/// Statement that moves the sequence `$1` past the largest key in `table`.
///
/// With rows present the sequence is set to `MAX(key)` and marked called, so
/// the next value is `MAX(key) + 1`. On an empty table it is set to 1 and
/// marked uncalled, so the next value is 1.
pub fn setval_statement(table: &TableSpec) -> String {
    let key = quote_ident(table.key_column);
    format!(
        "SELECT setval($1::regclass, COALESCE(MAX({key}), 1), MAX({key}) IS NOT NULL) FROM {}",
        quote_ident(table.name)
    )
}

/// Reset the sequence for one table. `Ok(None)` when the key column has no
/// backing sequence.
pub async fn adjust_sequence(conn: &mut PgConnection, table: &TableSpec) -> DbResult<Option<i64>> {
    let mut tx = conn.begin().await?;

    match reset_sequence(&mut *tx, table).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rb) = tx.rollback().await {
                error!(table = table.name, "Rollback failed: {}", rb);
            }
            Err(e.into())
        }
    }
}

async fn reset_sequence(
    conn: &mut PgConnection,
    table: &TableSpec,
) -> Result<Option<i64>, sqlx::Error> {
    let sequence: Option<String> = sqlx::query_scalar("SELECT pg_get_serial_sequence($1, $2)")
        .bind(quote_ident(table.name))
        .bind(table.key_column)
        .fetch_one(&mut *conn)
        .await?;

    let Some(sequence) = sequence else {
        return Ok(None);
    };

    let value: i64 = sqlx::query_scalar(&setval_statement(table))
        .bind(&sequence)
        .fetch_one(&mut *conn)
        .await?;
    Ok(Some(value))
}

/// Reset the sequence behind every table's key column.
///
/// Must run after all tables are loaded. Each table gets its own transaction;
/// a failure is reported and the next table still runs.
pub async fn adjust_sequences(conn: &mut PgConnection, tables: &TableOrder) -> Vec<ItemReport<i64>> {
    info!("Adjusting sequences for SERIAL primary keys...");

    let mut reports = Vec::with_capacity(tables.len());
    for table in tables {
        let outcome = match adjust_sequence(conn, table).await {
            Ok(Some(value)) => {
                info!(table = table.name, value, "Sequence for '{}' adjusted.", table.name);
                Outcome::Completed(value)
            }
            Ok(None) => {
                info!(
                    table = table.name,
                    "No sequence behind '{}.{}'; nothing to adjust.",
                    table.name,
                    table.key_column
                );
                Outcome::Skipped(format!("no sequence behind column '{}'", table.key_column))
            }
            Err(e) => {
                error!(
                    table = table.name,
                    "Sequence adjustment for '{}' failed: {}", table.name, e
                );
                Outcome::Failed(e.to_string())
            }
        };
        reports.push(ItemReport::new(table.name, outcome));
    }
    reports
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn setval_marks_empty_tables_uncalled() {
        let sql = setval_statement(&TableSpec::new("feedback", "id", &["leads", "agents"]));
        assert_eq!(
            sql,
            "SELECT setval($1::regclass, COALESCE(MAX(\"id\"), 1), MAX(\"id\") IS NOT NULL) FROM \"feedback\""
        );
    }

    #[test]
    fn setval_uses_designated_key_column() {
        let sql = setval_statement(&TableSpec::new("leads", "lead_no", &[]));
        assert!(sql.contains("MAX(\"lead_no\")"));
    }
}
