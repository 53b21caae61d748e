//! Error types for the export, restore and seeding workflows.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for leadport operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors raised by leadport.
///
/// Every variant returned from a workflow entry point is fatal. Per-table
/// problems never surface here; they are folded into a
/// [`RunSummary`](crate::RunSummary) instead.
#[derive(Debug, Error, Diagnostic)]
pub enum DbError {
    /// Credentials could not be resolved from the env file.
    #[error("Configuration error for field '{field}': {reason}")]
    #[diagnostic(
        code(leadport::configuration),
        help("Check the env file at {config_path}. DB_NAME, DB_USER and DB_PASSWORD are required")
    )]
    Configuration {
        config_path: String,
        field: String,
        reason: String,
    },

    /// The server refused or dropped the session.
    #[error("Database connection failed for '{database}'")]
    #[diagnostic(
        code(leadport::connection),
        help("Verify DB_HOST, DB_PORT and credentials, and that the server accepts connections")
    )]
    Connection {
        database: String,
        #[source]
        cause: sqlx::Error,
    },

    /// A schema file the workflow depends on is missing.
    #[error("Schema file not found: {}", path.display())]
    #[diagnostic(
        code(leadport::schema_not_found),
        help("Place schema.sql in the project root, or run `leadport export` before restoring")
    )]
    SchemaNotFound { path: PathBuf },

    /// The schema DDL failed and was rolled back.
    #[error("Schema apply failed for {}", path.display())]
    #[diagnostic(code(leadport::schema_apply))]
    SchemaApply {
        path: PathBuf,
        #[source]
        cause: sqlx::Error,
    },

    /// sqlx error
    #[error("Database error: {0}")]
    #[diagnostic(code(leadport::database))]
    Sqlx(#[from] sqlx::Error),

    /// CSV encode/decode error
    #[error("CSV error: {0}")]
    #[diagnostic(code(leadport::csv))]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(leadport::io))]
    Io(#[from] std::io::Error),

    /// Invalid data
    #[error("Invalid data: {message}")]
    #[diagnostic(code(leadport::invalid_data))]
    InvalidData { message: String },
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(
        config_path: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            config_path: config_path.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a schema-not-found error.
    pub fn schema_not_found(path: impl Into<PathBuf>) -> Self {
        Self::SchemaNotFound { path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_names_field() {
        let err = DbError::configuration("target.env", "DB_NAME", "missing");
        assert_eq!(
            err.to_string(),
            "Configuration error for field 'DB_NAME': missing"
        );
    }

    #[test]
    fn schema_not_found_shows_path() {
        let err = DbError::schema_not_found("exports/schema.sql");
        assert_eq!(err.to_string(), "Schema file not found: exports/schema.sql");
    }
}
