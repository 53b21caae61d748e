//! Command implementations shared by the `leadport` and `leadport-seed`
//! binaries.

pub mod export;
pub mod seed;

use owo_colors::OwoColorize;

use leadport_db::{ItemReport, Outcome, RunKind, RunSummary};

use crate::output::Output;

/// Exit status for a run that finished with at least one failed table or
/// sequence step. Fatal errors exit with 1 through miette.
pub const EXIT_PARTIAL_FAILURE: u8 = 2;

/// Process exit status for a finished run.
pub fn exit_code(summary: &RunSummary) -> u8 {
    if summary.is_clean() {
        0
    } else {
        EXIT_PARTIAL_FAILURE
    }
}

fn table_line(kind: RunKind, report: &ItemReport<u64>) -> String {
    let verb = match kind {
        RunKind::Export => "exported",
        RunKind::Restore => "restored",
    };
    match &report.outcome {
        Outcome::Completed(rows) => format!(
            "{}: {} {} {}",
            report.table,
            verb,
            rows,
            if *rows == 1 { "row" } else { "rows" }
        ),
        Outcome::Skipped(reason) => format!("{}: skipped ({})", report.table, reason),
        Outcome::Failed(reason) => format!("{}: failed ({})", report.table, reason),
    }
}

fn sequence_line(report: &ItemReport<i64>) -> String {
    match &report.outcome {
        Outcome::Completed(value) => format!("{}: set to {}", report.table, value),
        Outcome::Skipped(reason) => format!("{}: skipped ({})", report.table, reason),
        Outcome::Failed(reason) => format!("{}: failed ({})", report.table, reason),
    }
}

fn print_outcome<T>(output: &Output, outcome: &Outcome<T>, line: &str) {
    match outcome {
        Outcome::Completed(_) => output.success(line),
        Outcome::Skipped(_) => output.warning(line),
        Outcome::Failed(_) => output.error(line),
    }
}

/// Print a finished export or restore run, table by table.
pub fn render_summary(output: &Output, summary: &RunSummary) {
    output.section("Tables");
    for report in &summary.tables {
        print_outcome(output, &report.outcome, &table_line(summary.kind, report));
    }

    if !summary.sequences.is_empty() {
        output.section("Sequences");
        for report in &summary.sequences {
            print_outcome(output, &report.outcome, &sequence_line(report));
        }
    }

    println!();
    output.kv("Rows", &summary.total_rows().to_string());
    let skipped: Vec<&str> = summary.skipped_tables().collect();
    if !skipped.is_empty() {
        output.kv("Skipped", &skipped.join(", "));
    }

    if summary.is_clean() {
        output.success(&format!("Database {} completed.", summary.kind));
    } else {
        output.error(&format!(
            "Database {} finished with {} failed {}.",
            summary.kind,
            summary.failure_count().bright_red(),
            if summary.failure_count() == 1 {
                "step"
            } else {
                "steps"
            }
        ));
    }
}
