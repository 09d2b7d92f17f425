//! Gemini generateContent backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use testwright_core::{Prompt, ProviderClient, ProviderReply, WrightError, WrightResult};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::http::{build_client, non_empty, send_json};

/// Single text prompt, `candidates[0].content.parts[0].text` reply.
///
/// The key travels in the `key` query parameter rather than a header.
pub struct GeminiClient {
    config: ProviderConfig,
    api_key: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: ProviderConfig) -> WrightResult<Self> {
        let api_key = config.credential()?.to_string();
        let client = build_client(config.request_timeout)?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    /// Endpoint without the credential, safe to log.
    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn request_body(&self, prompt: &Prompt) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(prompt.combined()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
            },
        }
    }

    fn parse_reply(&self, response: GeminiResponse) -> WrightResult<ProviderReply> {
        let provider = self.config.kind.as_str();
        let part = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .ok_or_else(|| WrightError::malformed(provider, "response has no candidate parts"))?;
        let text = non_empty(provider, part.text)?;

        let reply = ProviderReply::new(text, provider, self.config.model.clone());
        Ok(match response.usage_metadata {
            Some(u) => reply.with_usage(u.prompt_token_count, u.candidates_token_count),
            None => reply,
        })
    }
}

#[async_trait]
impl ProviderClient for GeminiClient {
    async fn invoke(&self, prompt: &Prompt) -> WrightResult<ProviderReply> {
        let url = self.endpoint();
        debug!(provider = %self.config.kind, model = %self.config.model, %url, "Sending generateContent");

        let request = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(prompt));

        let response: GeminiResponse = send_json(self.config.kind.as_str(), request).await?;
        self.parse_reply(response)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}
