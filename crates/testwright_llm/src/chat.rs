//! Chat-completions backend (OpenAI and compatible APIs such as DeepSeek).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use testwright_core::{Prompt, ProviderClient, ProviderReply, WrightError, WrightResult};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::http::{build_client, non_empty, send_json};

/// Message-list request, `choices[0].message.content` reply.
pub struct ChatCompletionsClient {
    config: ProviderConfig,
    api_key: String,
    client: Client,
}

impl ChatCompletionsClient {
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
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, prompt: &Prompt) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt.system_instruction.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.user_instruction.clone(),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    fn parse_reply(&self, response: ChatResponse) -> WrightResult<ProviderReply> {
        let provider = self.config.kind.as_str();
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| WrightError::malformed(provider, "response has no choices"))?;
        let text = non_empty(provider, choice.message.content)?;

        let reply = ProviderReply::new(text, provider, self.config.model.clone());
        Ok(match response.usage {
            Some(u) => reply.with_usage(u.prompt_tokens, u.completion_tokens),
            None => reply,
        })
    }
}

#[async_trait]
impl ProviderClient for ChatCompletionsClient {
    async fn invoke(&self, prompt: &Prompt) -> WrightResult<ProviderReply> {
        let url = self.endpoint();
        debug!(provider = %self.config.kind, model = %self.config.model, %url, "Sending chat completion");

        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt));

        let response: ChatResponse = send_json(self.config.kind.as_str(), request).await?;
        self.parse_reply(response)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;

    fn client(kind: ProviderKind) -> ChatCompletionsClient {
        ChatCompletionsClient::new(ProviderConfig::new(kind).api_key(Some("test-key".into()))).unwrap()
    }

    #[test]
    fn test_missing_key_fails_fast() {
        let err = ChatCompletionsClient::new(ProviderConfig::new(ProviderKind::OpenAi)).err().unwrap();
        assert!(matches!(err, WrightError::CredentialMissing(_)));
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(client(ProviderKind::OpenAi).endpoint(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(
            client(ProviderKind::DeepSeek).endpoint(),
            "https://api.deepseek.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_shape() {
        let body = client(ProviderKind::OpenAi).request_body(&Prompt::new("sys", "usr"));
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "sys");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "usr");
        assert_eq!(json["max_tokens"], 4096);
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_parse_reply() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"test('a')"}}],
                "usage":{"prompt_tokens":12,"completion_tokens":34,"total_tokens":46}}"#,
        )
        .unwrap();

        let reply = client(ProviderKind::DeepSeek).parse_reply(response).unwrap();
        assert_eq!(reply.text, "test('a')");
        assert_eq!(reply.provider, "deepseek");
        assert_eq!(reply.model, "deepseek-chat");
        assert_eq!(reply.input_tokens, Some(12));
        assert_eq!(reply.output_tokens, Some(34));
    }

    #[test]
    fn test_empty_choices_is_malformed() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        let err = client(ProviderKind::OpenAi).parse_reply(response).unwrap_err();
        assert!(matches!(err, WrightError::ProviderMalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        let config = ProviderConfig::new(ProviderKind::OpenAi)
            .api_key(Some("test-key".into()))
            .base_url("http://127.0.0.1:9/v1");
        let err = ChatCompletionsClient::new(config)
            .unwrap()
            .invoke(&Prompt::new("sys", "usr"))
            .await
            .unwrap_err();
        assert!(matches!(err, WrightError::ProviderUnreachable { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_null_content_is_malformed() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(client(ProviderKind::OpenAi).parse_reply(response).is_err());
    }

    #[tokio::test]
    async fn test_rate_limited_reply_through_adapter() {
        let base = crate::http::stub::serve_once(crate::http::stub::response(
            "429 Too Many Requests",
            &[("Retry-After", "7")],
            r#"{"error":{"message":"Rate limit reached"}}"#,
        ))
        .await;
        let config = ProviderConfig::new(ProviderKind::DeepSeek)
            .api_key(Some("test-key".into()))
            .base_url(base);

        let err = ChatCompletionsClient::new(config)
            .unwrap()
            .invoke(&Prompt::new("sys", "usr"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WrightError::RateLimited { retry_after: Some(d), .. } if d.as_secs() == 7
        ));
    }
}
