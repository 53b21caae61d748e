//! On-disk layout of an export.

use std::path::{Path, PathBuf};

/// Default export directory, relative to the working directory.
pub const DEFAULT_EXPORT_DIR: &str = "exports";

/// Default schema source, relative to the working directory.
pub const DEFAULT_SCHEMA_SOURCE: &str = "schema.sql";

const EXPORTED_SCHEMA_NAME: &str = "schema.sql";

/// Where the schema source lives and where exported files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLayout {
    pub export_dir: PathBuf,
    pub schema_source: PathBuf,
}

impl ExportLayout {
    pub fn new(export_dir: impl Into<PathBuf>, schema_source: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
            schema_source: schema_source.into(),
        }
    }

    /// Copy of the schema inside the export directory.
    pub fn exported_schema(&self) -> PathBuf {
        self.export_dir.join(EXPORTED_SCHEMA_NAME)
    }

    /// CSV file for `table`.
    pub fn table_csv(&self, table: &str) -> PathBuf {
        self.export_dir.join(format!("{}.csv", table))
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }
}

impl Default for ExportLayout {
    fn default() -> Self {
        Self::new(DEFAULT_EXPORT_DIR, DEFAULT_SCHEMA_SOURCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths() {
        let layout = ExportLayout::default();
        assert_eq!(layout.exported_schema(), PathBuf::from("exports/schema.sql"));
        assert_eq!(layout.table_csv("leads"), PathBuf::from("exports/leads.csv"));
        assert_eq!(layout.schema_source, PathBuf::from("schema.sql"));
    }
}
