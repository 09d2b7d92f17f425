//! Anthropic messages backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use testwright_core::{Prompt, ProviderClient, ProviderReply, WrightError, WrightResult};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::http::{build_client, non_empty, send_json};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Separate system field, `content[0].text` reply.
pub struct AnthropicClient {
    config: ProviderConfig,
    api_key: String,
    client: Client,
}

impl AnthropicClient {
    pub fn new(config: ProviderConfig) -> WrightResult<Self> {
        let api_key = config.credential()?.to_string();
        let client = build_client(config.request_timeout)?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.config.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, prompt: &Prompt) -> AnthropicRequest {
        AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system: prompt.system_instruction.clone(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.user_instruction.clone(),
            }],
        }
    }

    fn parse_reply(&self, response: AnthropicResponse) -> WrightResult<ProviderReply> {
        let provider = self.config.kind.as_str();
        let block = response
            .content
            .into_iter()
            .find(|c| c.kind == "text")
            .ok_or_else(|| WrightError::malformed(provider, "response has no text content block"))?;
        let text = non_empty(provider, block.text)?;

        let reply = ProviderReply::new(text, provider, self.config.model.clone());
        Ok(match response.usage {
            Some(u) => reply.with_usage(u.input_tokens, u.output_tokens),
            None => reply,
        })
    }
}

#[async_trait]
impl ProviderClient for AnthropicClient {
    async fn invoke(&self, prompt: &Prompt) -> WrightResult<ProviderReply> {
        let url = self.endpoint();
        debug!(provider = %self.config.kind, model = %self.config.model, "Sending message request");

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(prompt));

        let response: AnthropicResponse = send_json(self.config.kind.as_str(), request).await?;
        self.parse_reply(response)
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContent>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}
