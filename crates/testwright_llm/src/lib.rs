//! # testwright_llm
//!
//! LLM provider adapters for the testwright pipeline.
//!
//! Each backend implements [`testwright_core::ProviderClient`]:
//!
//! | Kind | Adapter | Request | Reply |
//! |------|---------|---------|-------|
//! | `openai`, `deepseek` | [`ChatCompletionsClient`] | message list, bearer token | `choices[0].message.content` |
//! | `anthropic` | [`AnthropicClient`] | system + messages, `x-api-key` | `content[0].text` |
//! | `gemini` | [`GeminiClient`] | single text blob, `?key=` | `candidates[0].content.parts[0].text` |
//!
//! Adapters make one request per call and never retry; HTTP failures are
//! mapped onto [`testwright_core::WrightError`].

pub mod anthropic;
pub mod chat;
pub mod config;
pub mod gemini;
pub(crate) mod http;

use std::sync::Arc;

use testwright_core::{ProviderClient, WrightResult};
use tracing::info;

pub use anthropic::AnthropicClient;
pub use chat::ChatCompletionsClient;
pub use config::{is_placeholder_key, ProviderConfig, ProviderKind};
pub use gemini::GeminiClient;

/// Build the adapter for `config.kind`.
///
/// Fails with `CredentialMissing` before any network activity when the key
/// is absent or a placeholder.
pub fn build_provider(config: ProviderConfig) -> WrightResult<Arc<dyn ProviderClient>> {
    info!(provider = %config.kind, model = %config.model, "Using LLM provider");

    let provider: Arc<dyn ProviderClient> = match config.kind {
        ProviderKind::OpenAi | ProviderKind::DeepSeek => Arc::new(ChatCompletionsClient::new(config)?),
        ProviderKind::Anthropic => Arc::new(AnthropicClient::new(config)?),
        ProviderKind::Gemini => Arc::new(GeminiClient::new(config)?),
    };
    Ok(provider)
}
