use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use miette::Result;

use leadport_cli::commands::{self, export};
use leadport_cli::logging::{init_tracing, install_diagnostics};

#[derive(Parser, Debug)]
#[command(name = "leadport")]
#[command(about = "Export the CRM database to CSV files, or restore it from them")]
#[command(version)]
struct Cli {
    /// Operation to run
    #[arg(value_enum)]
    mode: Mode,

    /// Env file with DB_HOST, DB_PORT, DB_NAME, DB_USER and DB_PASSWORD
    #[arg(long)]
    env_file: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Write exports/schema.sql and one CSV per table
    Export,
    /// Recreate the schema and load the CSVs from exports/
    Restore,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    install_diagnostics()?;
    let cli = Cli::parse();
    init_tracing();

    let summary = match cli.mode {
        Mode::Export => export::export(&cli.env_file).await?,
        Mode::Restore => export::restore(&cli.env_file).await?,
    };

    Ok(ExitCode::from(commands::exit_code(&summary)))
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
    fn parses_mode_and_env_file() {
        let cli = Cli::try_parse_from(["leadport", "restore", "--env-file", "target.env"]).unwrap();
        assert_eq!(cli.mode, Mode::Restore);
        assert_eq!(cli.env_file, PathBuf::from("target.env"));
    }

    #[test]
    fn env_file_is_required() {
        assert!(Cli::try_parse_from(["leadport", "export"]).is_err());
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["leadport", "import", "--env-file", "a.env"]).is_err());
    }
}
