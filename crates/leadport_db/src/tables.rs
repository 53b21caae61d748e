//! The ordered list of tables leadport knows how to move.
//!
//! Order is a contract: a table may only reference tables that appear before
//! it, so exporting and restoring in list order never loads a child row ahead
//! of its parent.

use crate::error::{DbError, DbResult};

/// One table in the export/restore set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    /// Table name as it appears in the schema.
    pub name: &'static str,

    /// Key column. Export sorts by it; sequence repair resets the sequence
    /// that backs it.
    pub key_column: &'static str,

    /// Tables this one holds foreign keys into.
    pub depends_on: &'static [&'static str],
}

impl TableSpec {
    pub const fn new(
        name: &'static str,
        key_column: &'static str,
        depends_on: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            key_column,
            depends_on,
        }
    }
}

/// Built-in CRM tables, parents first.
pub const CRM_TABLES: &[TableSpec] = &[
    TableSpec::new("agents", "id", &[]),
    TableSpec::new("leads", "id", &["agents"]),
    TableSpec::new("feedback", "id", &["leads", "agents"]),
];

/// A validated, dependency-ordered list of tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOrder {
    tables: Vec<TableSpec>,
}

impl TableOrder {
    /// Validate `tables` and wrap them.
    ///
    /// Fails if a name repeats, a key column is empty, or a table depends on
    /// one that is not listed before it.
    pub fn new(tables: Vec<TableSpec>) -> DbResult<Self> {
        for (idx, table) in tables.iter().enumerate() {
            if table.key_column.is_empty() {
                return Err(DbError::invalid_data(format!(
                    "table '{}' has no key column",
                    table.name
                )));
            }

            let earlier = &tables[..idx];
            if earlier.iter().any(|t| t.name == table.name) {
                return Err(DbError::invalid_data(format!(
                    "table '{}' is listed more than once",
                    table.name
                )));
            }

            for dep in table.depends_on {
                if !earlier.iter().any(|t| t.name == *dep) {
                    return Err(DbError::invalid_data(format!(
                        "table '{}' depends on '{}', which must be listed before it",
                        table.name, dep
                    )));
                }
            }
        }

        Ok(Self { tables })
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableSpec> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Default for TableOrder {
    fn default() -> Self {
        // CRM_TABLES is parents-first by construction
        Self {
            tables: CRM_TABLES.to_vec(),
        }
    }
}

impl<'a> IntoIterator for &'a TableOrder {
    type Item = &'a TableSpec;
    type IntoIter = std::slice::Iter<'a, TableSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}

/// Quote an SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_order_is_valid() {
        let order = TableOrder::new(CRM_TABLES.to_vec()).unwrap();
        assert_eq!(order, TableOrder::default());

        let names: Vec<_> = order.iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["agents", "leads", "feedback"]);
    }

    #[test]
    fn rejects_child_before_parent() {
        let err = TableOrder::new(vec![
            TableSpec::new("leads", "id", &["agents"]),
            TableSpec::new("agents", "id", &[]),
        ])
        .unwrap_err();

        assert!(err.to_string().contains("'leads' depends on 'agents'"));
    }

    #[test]
    fn rejects_duplicates() {
        let err = TableOrder::new(vec![
            TableSpec::new("agents", "id", &[]),
            TableSpec::new("agents", "id", &[]),
        ])
        .unwrap_err();

        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_self_reference() {
        assert!(TableOrder::new(vec![TableSpec::new("agents", "id", &["agents"])]).is_err());
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("leads"), "\"leads\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
