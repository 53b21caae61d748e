//! Applying a schema file to a database.

use std::path::Path;

use sqlx::postgres::PgConnection;
use sqlx::Connection;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};

/// Run the DDL in `path` as a single transaction.
///
/// The file is executed verbatim and may hold any number of statements. On a
/// database error the transaction is rolled back and
/// [`DbError::SchemaApply`] is returned.
pub async fn apply_schema(conn: &mut PgConnection, path: &Path) -> DbResult<()> {
    if !tokio::fs::try_exists(path).await? {
        return Err(DbError::schema_not_found(path));
    }

    let ddl = tokio::fs::read_to_string(path).await?;
    debug!(path = %path.display(), bytes = ddl.len(), "Applying schema");

    let mut tx = conn.begin().await?;
    match sqlx::raw_sql(&ddl).execute(&mut *tx).await {
        Ok(_) => {
            tx.commit().await.map_err(|cause| DbError::SchemaApply {
                path: path.to_path_buf(),
                cause,
            })?;
            info!("Schema applied from '{}'", path.display());
            Ok(())
        }
        Err(cause) => {
            if let Err(e) = tx.rollback().await {
                warn!("Rollback after failed schema apply also failed: {}", e);
            }
            Err(DbError::SchemaApply {
                path: path.to_path_buf(),
                cause,
            })
        }
    }
}
