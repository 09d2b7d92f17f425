//! testwright CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success (or dry run rendered)
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Generation failed
//! - 4: Input error
//! - 5: Credential or authentication error
//! - 6: Backup or write error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use testwright_core::WrightError;

mod commands;
mod settings;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, &cli.run).await,
        Commands::Repair(args) => commands::repair::execute(args, &cli.run).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "testwright=debug" } else { "testwright=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},warn", default_level)));

    // Already initialized is fine.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .try_init();
}

/// Map an error to its exit code.
fn categorize_error(e: &anyhow::Error) -> u8 {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<WrightError>())
        .map(WrightError::exit_code)
        .unwrap_or(ExitCodes::GENERAL_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_categorize_pipeline_errors() {
        let err = anyhow::Error::from(WrightError::GenerationFailed {
            attempts: 3,
            last_reason: "no import".into(),
        });
        assert_eq!(categorize_error(&err), 3);

        let err = anyhow::Error::from(WrightError::InputNotFound(PathBuf::from("a.txt")))
            .context("while loading the description");
        assert_eq!(categorize_error(&err), 4);

        let err = anyhow::anyhow!("something else");
        assert_eq!(categorize_error(&err), ExitCodes::GENERAL_ERROR);
    }

    #[test]
    fn test_cli_parses_repair() {
        let cli = Cli::try_parse_from([
            "testwright",
            "repair",
            "--test",
            "tests/login.spec.ts",
            "--log",
            "error.log",
            "--dry-run",
            "--model",
            "gpt-4o-mini",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Repair(_)));
        assert!(cli.run.dry_run);
        assert_eq!(cli.run.model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_run_options_accepted_before_subcommand() {
        let cli = Cli::try_parse_from([
            "testwright",
            "--dry-run",
            "--provider",
            "gemini",
            "repair",
            "--test",
            "a.spec.ts",
            "--log",
            "a.log",
            "--max-attempts",
            "5",
        ])
        .unwrap();
        assert!(cli.run.dry_run);
        assert_eq!(cli.run.provider.as_deref(), Some("gemini"));
        assert_eq!(cli.run.max_attempts, Some(5));
    }

    #[test]
    fn test_cli_requires_log_for_repair() {
        let err = Cli::try_parse_from(["testwright", "repair", "--test", "a.spec.ts"])
            .err()
            .unwrap();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_help_exits_zero() {
        let err = Cli::try_parse_from(["testwright", "--help"]).err().unwrap();
        assert_eq!(err.exit_code(), 0);
    }
}
