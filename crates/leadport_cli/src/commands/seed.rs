//! Seed a development database with fake CRM data.

use std::path::Path;

use miette::Result;
use owo_colors::OwoColorize;
use tracing::info;

use leadport_db::{
    connect, disconnect, seed_database, ConnectionConfig, SeedConfig, SeedGenerator, SeedReport,
};

use crate::output::Output;

/// Apply `schema` and insert a random batch of agents, leads and feedback.
pub async fn seed(env_file: &Path, schema: &Path) -> Result<SeedReport> {
    let output = Output::new();
    info!(path = %env_file.display(), "Loading connection settings");
    let config = ConnectionConfig::from_env_file(env_file)?;

    output.status(&format!(
        "Seeding '{}' on {}:{}...",
        config.database.bright_cyan(),
        config.host,
        config.port
    ));

    let mut conn = connect(&config).await?;
    let mut generator = SeedGenerator::new(rand::rng(), SeedConfig::default())?;
    let result = seed_database(&mut conn, schema, &mut generator).await;
    disconnect(conn).await;
    let report = result?;

    render_report(&output, &report);
    Ok(report)
}

fn render_report(output: &Output, report: &SeedReport) {
    output.section("Inserted");
    output.kv("Agents", &report.agent_ids.len().to_string());
    output.kv("Leads", &report.leads.len().to_string());
    output.kv("Feedback", &report.feedback.len().to_string());

    if report.feedback_cut_short {
        output.warning("No feedback created: no leads or agents available.");
    }
    output.success("Database setup complete.");
}
