//! Repair command - Fix a failing test from its error log.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use testwright_core::ContentSource;

use super::{print_report, run_pipeline, RunArgs};

#[derive(Args)]
pub struct RepairArgs {
    /// The failing test file; it is overwritten with the fix
    #[arg(short, long)]
    test: PathBuf,

    /// Error log produced by the failing run
    #[arg(short, long)]
    log: PathBuf,
}

pub async fn execute(args: RepairArgs, run: &RunArgs) -> Result<()> {
    info!(
        "Repairing {} using {}",
        args.test.display(),
        args.log.display()
    );

    let task = ContentSource::repair(&args.test, &args.log)?;
    let report = run_pipeline(run, task, &args.test).await?;
    print_report(&report);

    Ok(())
}
