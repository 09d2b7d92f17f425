//! Provider selection and credentials.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use testwright_core::{WrightError, WrightResult};

/// Default sampling temperature; low to favor repeatable output.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Default ceiling on generated tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    DeepSeek,
    Anthropic,
    Gemini,
}

impl ProviderKind {
    /// Order used when picking a provider from whichever key is present.
    pub const DETECTION_ORDER: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Gemini,
        ProviderKind::DeepSeek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }

    /// Environment variable holding this backend's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::DeepSeek => "DEEPSEEK_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::DeepSeek => "deepseek-chat",
            Self::Anthropic => "claude-sonnet-4-5",
            Self::Gemini => "gemini-2.0-flash",
        }
    }

    /// First kind in [`Self::DETECTION_ORDER`] whose key `env` reports as
    /// usable. Empty and placeholder keys are skipped.
    pub fn detect<F>(env: F) -> Option<ProviderKind>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::DETECTION_ORDER
            .into_iter()
            .find(|kind| env(kind.api_key_env()).is_some_and(|key| !is_placeholder_key(&key)))
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::DeepSeek => "https://api.deepseek.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = WrightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "deepseek" => Ok(Self::DeepSeek),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(WrightError::InvalidConfig(format!(
                "unknown provider '{}'; expected openai, deepseek, anthropic or gemini",
                other
            ))),
        }
    }
}

/// Connection settings for one backend.
#[derive(Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
}

// Hand-written so the key never reaches logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Defaults for `kind` with no credential attached.
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            api_key: None,
            model: kind.default_model().to_string(),
            base_url: kind.default_base_url().to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// The usable API key, or `CredentialMissing` if it is absent or a placeholder.
    pub fn credential(&self) -> WrightResult<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !is_placeholder_key(key) => Ok(key),
            _ => Err(WrightError::CredentialMissing(format!(
                "{} (set {})",
                self.kind,
                self.kind.api_key_env()
            ))),
        }
    }
}

/// Recognize empty keys and the usual copy-paste placeholders.
pub fn is_placeholder_key(key: &str) -> bool {
    let key = key.trim();
    if key.is_empty() {
        return true;
    }

    let lower = key.to_lowercase();
    let known = [
        "your-api-key",
        "your_api_key",
        "your-api-key-here",
        "your_api_key_here",
        "api-key",
        "changeme",
        "replace-me",
        "todo",
        "none",
        "null",
    ];
    if known.contains(&lower.as_str()) {
        return true;
    }

    if key.starts_with('<') && key.ends_with('>') {
        return true;
    }

    // "sk-...", "xxxxxxxx", "sk-xxxx"
    let body = lower.trim_start_matches("sk-");
    !body.is_empty() && body.chars().all(|c| c == '.' || c == 'x' || c == '*')
}
