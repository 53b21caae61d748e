//! Connection credentials and session setup.
//!
//! Credentials come from a dotenv-style file layered under the process
//! environment. A variable already set in the environment wins; the file only
//! fills keys the environment lacks, so a shell that exports `DB_PASSWORD` can
//! pair with an env file that omits it.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};

pub const DB_HOST: &str = "DB_HOST";
pub const DB_PORT: &str = "DB_PORT";
pub const DB_NAME: &str = "DB_NAME";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASSWORD: &str = "DB_PASSWORD";

/// Host used when `DB_HOST` is unset.
pub const DEFAULT_HOST: &str = "localhost";

/// Port used when `DB_PORT` is unset.
pub const DEFAULT_PORT: u16 = 5432;

/// Resolved PostgreSQL credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    password: String,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ConnectionConfig {
    /// Load credentials from an env file. Variables already set in the process
    /// environment take precedence over the file's values.
    pub fn from_env_file(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        let source = path.display().to_string();
        debug!("Reading credentials from {}", source);

        let entries = dotenvy::from_path_iter(path)
            .map_err(|e| DbError::configuration(&source, "file", e.to_string()))?;

        let mut vars = HashMap::new();
        for entry in entries {
            let (key, value) =
                entry.map_err(|e| DbError::configuration(&source, "file", e.to_string()))?;
            vars.insert(key, value);
        }

        Self::from_vars(&source, |key| {
            std::env::var(key).ok().or_else(|| vars.get(key).cloned())
        })
    }

    /// Resolve credentials through `lookup`.
    ///
    /// Empty values count as missing. Host and port fall back to
    /// [`DEFAULT_HOST`] and [`DEFAULT_PORT`]; database name, user and password
    /// are required.
    pub fn from_vars(source: &str, lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| DbError::configuration(source, key, "missing or empty"))
        };

        let database = require(DB_NAME)?;
        let user = require(DB_USER)?;
        let password = require(DB_PASSWORD)?;

        let host = get(DB_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(DB_PORT) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                DbError::configuration(source, DB_PORT, format!("'{}' is not a valid port: {}", raw, e))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host,
            port,
            database,
            user,
            password,
        })
    }

    /// sqlx connect options for these credentials.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
    }
}

/// Open a single database session.
pub async fn connect(config: &ConnectionConfig) -> DbResult<PgConnection> {
    debug!(
        host = %config.host,
        port = config.port,
        user = %config.user,
        "Opening database session"
    );

    let conn = PgConnection::connect_with(&config.connect_options())
        .await
        .map_err(|cause| DbError::Connection {
            database: config.database.clone(),
            cause,
        })?;

    info!("Connected to database: {}", config.database);
    Ok(conn)
}

/// Close a session, logging rather than failing if the server already hung up.
pub async fn disconnect(conn: PgConnection) {
    match conn.close().await {
        Ok(()) => info!("Database connection closed."),
        Err(e) => warn!("Error while closing database connection: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use serial_test::serial;

    use super::*;

    const ALL_KEYS: [&str; 5] = [DB_HOST, DB_PORT, DB_NAME, DB_USER, DB_PASSWORD];

    fn clear_process_env() {
        for key in ALL_KEYS {
            std::env::remove_var(key);
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_host_and_port() {
        let env = vars(&[
            (DB_NAME, "crm"),
            (DB_USER, "crm_admin"),
            (DB_PASSWORD, "hunter2"),
        ]);
        let config = ConnectionConfig::from_vars("test.env", |k| env.get(k).cloned()).unwrap();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "crm");
        assert_eq!(config.user, "crm_admin");
    }

    #[test]
    fn missing_database_name_is_configuration_error() {
        let env = vars(&[(DB_USER, "crm_admin"), (DB_PASSWORD, "hunter2")]);
        let err = ConnectionConfig::from_vars("test.env", |k| env.get(k).cloned()).unwrap_err();

        match err {
            DbError::Configuration { field, .. } => assert_eq!(field, DB_NAME),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn empty_password_counts_as_missing() {
        let env = vars(&[(DB_NAME, "crm"), (DB_USER, "crm_admin"), (DB_PASSWORD, "  ")]);
        let err = ConnectionConfig::from_vars("test.env", |k| env.get(k).cloned()).unwrap_err();

        assert!(matches!(err, DbError::Configuration { ref field, .. } if field == DB_PASSWORD));
    }

    #[test]
    fn rejects_non_numeric_port() {
        let env = vars(&[
            (DB_NAME, "crm"),
            (DB_USER, "crm_admin"),
            (DB_PASSWORD, "hunter2"),
            (DB_PORT, "fivefourthreetwo"),
        ]);
        let err = ConnectionConfig::from_vars("test.env", |k| env.get(k).cloned()).unwrap_err();

        assert!(matches!(err, DbError::Configuration { ref field, .. } if field == DB_PORT));
    }

    #[test]
    fn debug_output_hides_password() {
        let env = vars(&[
            (DB_NAME, "crm"),
            (DB_USER, "crm_admin"),
            (DB_PASSWORD, "hunter2"),
        ]);
        let config = ConnectionConfig::from_vars("test.env", |k| env.get(k).cloned()).unwrap();

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    #[serial]
    fn reads_env_file() {
        clear_process_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "DB_HOST=db.internal\nDB_PORT=6543\nDB_NAME=crm\nDB_USER=crm_admin\nDB_PASSWORD=\"p@ss word\""
        )
        .unwrap();

        let config = ConnectionConfig::from_env_file(file.path()).unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6543);
        assert_eq!(config.password, "p@ss word");
    }

    #[test]
    fn missing_env_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConnectionConfig::from_env_file(dir.path().join("nope.env")).unwrap_err();

        assert!(matches!(err, DbError::Configuration { ref field, .. } if field == "file"));
    }

    #[test]
    #[serial]
    fn process_environment_overrides_env_file() {
        clear_process_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "DB_NAME=from_file\nDB_USER=file_user\nDB_PASSWORD=file_secret"
        )
        .unwrap();
        std::env::set_var(DB_NAME, "from_process");

        let config = ConnectionConfig::from_env_file(file.path());
        clear_process_env();
        let config = config.unwrap();

        assert_eq!(config.database, "from_process");
        assert_eq!(config.user, "file_user");
    }

    #[test]
    #[serial]
    fn env_file_fills_keys_missing_from_process_environment() {
        clear_process_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DB_NAME=crm\nDB_USER=crm_admin").unwrap();
        std::env::set_var(DB_PASSWORD, "from_shell");

        let config = ConnectionConfig::from_env_file(file.path());
        clear_process_env();
        let config = config.unwrap();

        assert_eq!(config.database, "crm");
        assert_eq!(config.password, "from_shell");
    }
}
