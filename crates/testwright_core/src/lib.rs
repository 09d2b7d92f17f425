//! # testwright_core
//!
//! Generation/repair pipeline that turns test intents and failure logs into
//! Playwright test source via a pluggable LLM provider.
//!
//! ## Flow
//!
//! ```text
//! ┌───────────────┐   ┌───────────────┐   ┌──────────────────────────────────┐   ┌──────────────┐
//! │ ContentSource │──▶│ PromptBuilder │──▶│ RetryController                  │──▶│  OutputSink  │
//! └───────────────┘   └───────────────┘   │  ProviderClient → Normalizer →   │   │ backup+write │
//!                                         │  OutputValidator (× attempts)    │   └──────────────┘
//!                                         └──────────────────────────────────┘
//! ```
//!
//! Provider adapters live in `testwright_llm`; this crate only defines the
//! [`ProviderClient`] seam they plug into.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use testwright_core::{ContentSource, Pipeline, PipelineConfig, ProviderClient};
//!
//! # async fn demo(provider: Arc<dyn ProviderClient>) -> testwright_core::WrightResult<()> {
//! let task = ContentSource::repair("tests/login.spec.ts", "test-results/error.log")?;
//! let pipeline = Pipeline::new(provider, PipelineConfig::default())?;
//! let report = pipeline.run(&task, "tests/login.spec.ts").await?;
//! println!("wrote {} after {} attempt(s)", report.outcome.path().display(), report.attempts.len());
//! # Ok(())
//! # }
//! ```

pub mod anchors;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod retry;
pub mod sink;
pub mod source;
pub mod types;
pub mod validator;

pub use anchors::SourceAnchors;
pub use error::{WrightError, WrightResult};
pub use normalizer::{Extraction, ExtractionMethod, ResponseNormalizer};
pub use pipeline::{Pipeline, PipelineConfig, PipelineReport};
pub use prompt::{PromptBuilder, DEFAULT_MAX_INPUT_BYTES};
pub use provider::ProviderClient;
pub use retry::{RetryController, RetryOutcome, RetryPolicy};
pub use sink::{OutputSink, WriteOptions, WriteOutcome, BACKUP_MARKER};
pub use source::ContentSource;
pub use types::{AttemptRecord, BackupDescriptor, Prompt, ProviderReply, TaskInput, DEFAULT_LIBRARY};
pub use validator::{OutputValidator, ValidationResult};
