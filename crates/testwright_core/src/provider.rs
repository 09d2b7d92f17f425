//! Provider client trait.

use async_trait::async_trait;

use crate::error::WrightResult;
use crate::types::{Prompt, ProviderReply};

/// A single LLM backend.
///
/// Implementations make exactly one outbound request per call and never
/// retry internally; retries belong to [`crate::RetryController`] so every
/// attempt is observable on its own. Backend-specific failures must be
/// mapped onto [`crate::WrightError`] rather than leaking transport errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Send the prompt and return the raw reply text.
    async fn invoke(&self, prompt: &Prompt) -> WrightResult<ProviderReply>;
}
