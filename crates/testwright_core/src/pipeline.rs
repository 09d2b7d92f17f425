//! End-to-end generation/repair orchestration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, Instrument};
use uuid::Uuid;

use crate::anchors::SourceAnchors;
use crate::error::{WrightError, WrightResult};
use crate::normalizer::{ExtractionMethod, ResponseNormalizer};
use crate::prompt::{PromptBuilder, DEFAULT_MAX_INPUT_BYTES};
use crate::provider::ProviderClient;
use crate::retry::{RetryController, RetryPolicy};
use crate::sink::{OutputSink, WriteOptions, WriteOutcome};
use crate::types::{AttemptRecord, TaskInput, DEFAULT_LIBRARY};
use crate::validator::OutputValidator;

/// Everything the pipeline needs besides the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Automation library module the tests import
    pub library: String,
    /// Per-input size ceiling for the prompt builder
    pub max_input_bytes: usize,
    pub retry: RetryPolicy,
    pub write: WriteOptions,
    /// Upper bound on the whole run, across all attempts and delays
    pub run_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            library: DEFAULT_LIBRARY.to_string(),
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            retry: RetryPolicy::default(),
            write: WriteOptions::default(),
            run_timeout: None,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub method: ExtractionMethod,
    pub attempts: Vec<AttemptRecord>,
    pub outcome: WriteOutcome,
}

/// ContentSource → PromptBuilder → RetryController → OutputSink.
pub struct Pipeline {
    provider: Arc<dyn ProviderClient>,
    builder: PromptBuilder,
    retry: RetryController,
    write: WriteOptions,
    run_timeout: Option<Duration>,
}

impl Pipeline {
    pub fn new(provider: Arc<dyn ProviderClient>, config: PipelineConfig) -> WrightResult<Self> {
        let anchors = SourceAnchors::new(config.library.clone())?;
        let builder = PromptBuilder::new()
            .library(config.library)
            .max_input_bytes(config.max_input_bytes);
        let retry = RetryController::new(
            config.retry,
            ResponseNormalizer::new(anchors.clone())?,
            OutputValidator::new(anchors),
        );

        Ok(Self {
            provider,
            builder,
            retry,
            write: config.write,
            run_timeout: config.run_timeout,
        })
    }

    /// Run one task and write the result to `target`.
    ///
    /// The target is touched at most once, after a candidate passed
    /// validation (or validation was skipped).
    pub async fn run(&self, task: &TaskInput, target: impl AsRef<Path>) -> WrightResult<PipelineReport> {
        let run_id = Uuid::new_v4();
        let target = target.as_ref();
        let span = tracing::info_span!("run", %run_id, mode = task.mode());

        let work = self.run_inner(run_id, task, target).instrument(span);
        match self.run_timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| WrightError::RunTimedOut(limit))?,
            None => work.await,
        }
    }

    async fn run_inner(&self, run_id: Uuid, task: &TaskInput, target: &Path) -> WrightResult<PipelineReport> {
        info!(target = %target.display(), "Starting {} run", task.mode());

        let prompt = self.builder.build(task)?;
        debug!(system = %prompt.system_instruction, user = %prompt.user_instruction, "Built prompt");

        let outcome = self.retry.run(self.provider.as_ref(), &prompt).await?;
        let write = OutputSink::write(target, &outcome.extraction.code, self.write)?;

        Ok(PipelineReport {
            run_id,
            method: outcome.extraction.method,
            attempts: outcome.attempts,
            outcome: write,
        })
    }
}
