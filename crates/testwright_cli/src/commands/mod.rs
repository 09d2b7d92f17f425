//! CLI command definitions.
//!
//! Each subcommand maps to one pipeline mode.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use testwright_core::{Pipeline, PipelineReport, TaskInput, WriteOutcome};
use testwright_llm::build_provider;

use crate::settings::{resolve, WorkspaceSettings};

pub mod generate;
pub mod repair;

/// testwright - LLM-assisted Playwright test generation and repair
#[derive(Parser)]
#[command(name = "testwright")]
#[command(version, about = "testwright - LLM-assisted Playwright test generation and repair")]
#[command(long_about = r#"
testwright turns plain-language test descriptions and failing-test logs into
runnable Playwright test files using an LLM provider.

WORKFLOWS:
  generate  → Write a new test file from a description
  repair    → Fix a failing test using its error log (backs up the original)

CREDENTIALS:
  OPENAI_API_KEY, ANTHROPIC_API_KEY, GEMINI_API_KEY, DEEPSEEK_API_KEY

EXIT CODES:
  0 - Success (or dry run rendered)
  1 - General error
  2 - Invalid arguments
  3 - Generation failed
  4 - Input error
  5 - Credential or authentication error
  6 - Backup or write error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a new test from a description file
    Generate(generate::GenerateArgs),

    /// Repair a failing test using its error log
    Repair(repair::RepairArgs),
}

/// Options shared by every pipeline run; accepted before or after the subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// LLM provider (openai, deepseek, anthropic, gemini)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Model name override
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Overwrite the target without taking a backup
    #[arg(long, global = true)]
    pub no_backup: bool,

    /// Print the result instead of writing it
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Accept the first extracted candidate without structural checks
    #[arg(long, global = true)]
    pub skip_validation: bool,

    /// Maximum provider attempts
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Overall run timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Workspace root holding .testwright/settings.json (default: current directory)
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,
}

/// Resolve configuration, build the provider and run one task.
pub(crate) async fn run_pipeline(run: &RunArgs, task: TaskInput, target: &Path) -> Result<PipelineReport> {
    let workspace = match &run.workspace {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let settings = WorkspaceSettings::load(&workspace)?;
    let config = resolve(&settings, run, |key| std::env::var(key).ok())?;

    let provider = build_provider(config.provider)?;
    let pipeline = Pipeline::new(provider, config.pipeline)?;

    Ok(pipeline.run(&task, target).await?)
}

/// Print what happened to the operator.
pub(crate) fn print_report(report: &PipelineReport) {
    match &report.outcome {
        WriteOutcome::DryRun { path, rendered } => {
            println!("── dry run: {} (not written) ──", path.display());
            println!("{}", rendered);
            println!("──");
        }
        WriteOutcome::Written { path, backup } => {
            if let Some(backup) = backup {
                println!("💾 Backup: {}", backup.backup_path.display());
            }
            println!("✅ Wrote {}", path.display());
        }
    }
    println!(
        "   {} attempt(s), candidate extraction: {}",
        report.attempts.len(),
        report.method
    );
}
