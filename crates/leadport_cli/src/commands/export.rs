//! Export and restore commands.
//!
//! Both read connection settings from an env file, open one session and hand
//! it to the workflow, which closes it when done.

use std::path::Path;

use miette::Result;
use owo_colors::OwoColorize;
use tracing::info;

use leadport_db::{
    connect, ConnectionConfig, ExportLayout, Exporter, Restorer, RunSummary, TableOrder,
};

use super::render_summary;
use crate::output::Output;

fn load_config(output: &Output, env_file: &Path) -> Result<ConnectionConfig> {
    info!(path = %env_file.display(), "Loading connection settings");
    let config = ConnectionConfig::from_env_file(env_file)?;
    output.status(&format!(
        "Connecting to '{}' on {}:{}...",
        config.database.bright_cyan(),
        config.host,
        config.port
    ));
    Ok(config)
}

/// Export the schema and every table to `exports/`.
pub async fn export(env_file: &Path) -> Result<RunSummary> {
    let output = Output::new();
    let config = load_config(&output, env_file)?;
    let conn = connect(&config).await?;

    let layout = ExportLayout::default();
    output.status(&format!(
        "Exporting to {}...",
        layout.export_dir().display().bright_cyan()
    ));

    let summary = Exporter::new(conn, layout, TableOrder::default())
        .export_all()
        .await?;

    render_summary(&output, &summary);
    Ok(summary)
}

/// Recreate the schema from `exports/schema.sql` and load every table CSV.
pub async fn restore(env_file: &Path) -> Result<RunSummary> {
    let output = Output::new();
    let config = load_config(&output, env_file)?;
    let conn = connect(&config).await?;

    let layout = ExportLayout::default();
    output.status(&format!(
        "Restoring from {}...",
        layout.export_dir().display().bright_cyan()
    ));

    let summary = Restorer::new(conn, layout, TableOrder::default())
        .restore_all()
        .await?;

    render_summary(&output, &summary);
    Ok(summary)
}
