use std::path::PathBuf;

use clap::Parser;
use miette::Result;

use leadport_cli::commands::seed;
use leadport_cli::logging::{init_tracing, install_diagnostics};

#[derive(Parser, Debug)]
#[command(name = "leadport-seed")]
#[command(about = "Create the CRM schema and fill it with fake data")]
#[command(version)]
struct Cli {
    /// Env file with DB_HOST, DB_PORT, DB_NAME, DB_USER and DB_PASSWORD
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Schema DDL applied before seeding
    #[arg(long, default_value = "schema.sql")]
    schema: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_diagnostics()?;
    let cli = Cli::parse();
    init_tracing();

    seed::seed(&cli.env_file, &cli.schema).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_point_at_repository_files() {
        let cli = Cli::try_parse_from(["leadport-seed"]).unwrap();
        assert_eq!(cli.env_file, PathBuf::from(".env"));
        assert_eq!(cli.schema, PathBuf::from("schema.sql"));
    }
}
