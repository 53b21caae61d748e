//! leadport database layer
//!
//! Export, restore and seeding workflows for the CRM PostgreSQL database.
//!
//! # Architecture
//!
//! - **One session per run** - each workflow owns a single `PgConnection` and
//!   closes it on the way out, whatever happened in between
//! - **Ordered tables** - [`TableOrder`] lists tables parents-first and is
//!   shared by export and restore
//! - **Typed outcomes** - per-table results land in a [`RunSummary`]; only
//!   run-wide failures (credentials, connection, schema) are errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use leadport_db::{connect, ConnectionConfig, ExportLayout, Exporter, TableOrder};
//!
//! let config = ConnectionConfig::from_env_file("source.env")?;
//! let conn = connect(&config).await?;
//! let summary = Exporter::new(conn, ExportLayout::default(), TableOrder::default())
//!     .export_all()
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod layout;
pub mod restore;
pub mod schema;
pub mod seed;
pub mod sequences;
pub mod summary;
pub mod tables;

pub use config::{connect, disconnect, ConnectionConfig};
pub use error::{DbError, DbResult};
pub use export::Exporter;
pub use layout::ExportLayout;
pub use restore::Restorer;
pub use schema::apply_schema;
pub use seed::{seed_database, SeedConfig, SeedGenerator, SeedReport};
pub use sequences::adjust_sequences;
pub use summary::{ItemReport, Outcome, RunKind, RunSummary};
pub use tables::{TableOrder, TableSpec, CRM_TABLES};
