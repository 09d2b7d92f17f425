//! Generate command - Write a new test from a description.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use tracing::info;

use testwright_core::ContentSource;

use super::{print_report, run_pipeline, RunArgs};

/// Directory generated tests land in when no output is given.
const DEFAULT_TEST_DIR: &str = "tests";

#[derive(Args)]
pub struct GenerateArgs {
    /// File containing the plain-language test description
    #[arg(short, long)]
    description: PathBuf,

    /// Where to write the generated test (default: tests/<description-name>.spec.ts)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn execute(args: GenerateArgs, run: &RunArgs) -> Result<()> {
    let target = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.description));
    info!("Generating test from {}", args.description.display());

    let task = ContentSource::description(&args.description)?;
    let report = run_pipeline(run, task, &target).await?;
    print_report(&report);

    Ok(())
}

fn default_output(description: &Path) -> PathBuf {
    let stem = description
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "generated".to_string());
    PathBuf::from(DEFAULT_TEST_DIR).join(format!("{}.spec.ts", slug(&stem)))
}

fn slug(name: &str) -> String {
    let slug = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "generated".to_string()
    } else {
        slug
    }
}
