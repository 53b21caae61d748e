//! Per-item outcomes and run summaries.

use std::fmt;

/// Result of one per-table step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Step ran to completion.
    Completed(T),
    /// Step had nothing to do (e.g. no CSV for the table).
    Skipped(String),
    /// Step failed and its transaction was rolled back.
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    pub fn completed(&self) -> Option<&T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// Outcome for a named table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport<T> {
    pub table: String,
    pub outcome: Outcome<T>,
}

impl<T> ItemReport<T> {
    pub fn new(table: impl Into<String>, outcome: Outcome<T>) -> Self {
        Self {
            table: table.into(),
            outcome,
        }
    }
}

/// Which workflow produced a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Export,
    Restore,
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunKind::Export => f.write_str("export"),
            RunKind::Restore => f.write_str("restore"),
        }
    }
}

/// Everything an export or restore run did, table by table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub kind: RunKind,
    /// Row counts per table, in table order.
    pub tables: Vec<ItemReport<u64>>,
    /// Value each sequence was set to. Empty for exports.
    pub sequences: Vec<ItemReport<i64>>,
}

impl RunSummary {
    pub fn new(kind: RunKind) -> Self {
        Self {
            kind,
            tables: Vec::new(),
            sequences: Vec::new(),
        }
    }

    pub fn record_table(&mut self, table: impl Into<String>, outcome: Outcome<u64>) {
        self.tables.push(ItemReport::new(table, outcome));
    }

    pub fn record_sequence(&mut self, table: impl Into<String>, outcome: Outcome<i64>) {
        self.sequences.push(ItemReport::new(table, outcome));
    }

    /// Total rows moved across completed tables.
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().filter_map(|r| r.outcome.completed()).sum()
    }

    /// Number of failed table and sequence steps.
    pub fn failure_count(&self) -> usize {
        self.tables.iter().filter(|r| r.outcome.is_failed()).count()
            + self.sequences.iter().filter(|r| r.outcome.is_failed()).count()
    }

    /// Tables that were skipped.
    pub fn skipped_tables(&self) -> impl Iterator<Item = &str> {
        self.tables
            .iter()
            .filter(|r| r.outcome.is_skipped())
            .map(|r| r.table.as_str())
    }

    /// True when nothing failed. Skips do not count as failures.
    pub fn is_clean(&self) -> bool {
        self.failure_count() == 0
    }
}
