//! Chat-completion client used by the relevance classifier.
//!
//! [`CompletionClient`] is the seam between classification and the remote
//! model: [`OpenAiClient`] talks to an OpenAI-compatible `chat/completions`
//! endpoint, tests substitute scripted clients.
//!
//! Each call is a single request. There is no retry and no backoff; a failed
//! call surfaces as a [`ClassificationError`] and the caller degrades it to a
//! default verdict.

use crate::config::LlmConfig;
use crate::error::ClassificationError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, instrument, warn};

/// Send a prompt, receive the completion text.
pub trait CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, ClassificationError>;
}

impl<T: CompletionClient> CompletionClient for &T {
    async fn complete(&self, prompt: &str) -> Result<String, ClassificationError> {
        (**self).complete(prompt).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completion endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Build a client from the `llm` config section.
    ///
    /// `model` overrides the configured model when given.
    pub fn new(
        llm: &LlmConfig,
        api_key: impl Into<String>,
        model: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ClassificationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: llm.endpoint.clone(),
            api_key: api_key.into(),
            model: model.unwrap_or(&llm.model).to_string(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionClient for OpenAiClient {
    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, ClassificationError> {
        let t0 = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %detail, "Completion API returned an error");
            return Err(ClassificationError::Status(status.as_u16()));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        match content {
            Some(text) => {
                debug!(
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    chars = text.chars().count(),
                    "Completion received"
                );
                Ok(text)
            }
            None => {
                warn!("Completion response carried no message content");
                Err(ClassificationError::MissingContent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, model: Option<&str>) -> OpenAiClient {
        let llm = LlmConfig {
            endpoint: format!("{}/v1/chat/completions", server.uri()),
            ..LlmConfig::default()
        };
        OpenAiClient::new(&llm, "sk-test", model, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_complete_sends_single_user_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 300,
                "messages": [{"role": "user", "content": "안녕"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "적합성: true"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("gpt-4o-mini"));
        assert_eq!(client.model(), "gpt-4o-mini");
        let text = client.complete("안녕").await.unwrap();
        assert_eq!(text, "적합성: true");
    }

    #[tokio::test]
    async fn test_non_success_status_maps_to_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, None).complete("x").await.unwrap_err();
        assert!(matches!(err, ClassificationError::Status(429)));
        assert_eq!(err.to_string(), "API 오류: 429");
    }

    #[tokio::test]
    async fn test_missing_choices_is_missing_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client_for(&server, None).complete("x").await.unwrap_err();
        assert!(matches!(err, ClassificationError::MissingContent));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server, None).complete("x").await.unwrap_err();
        assert!(matches!(err, ClassificationError::Transport(_)));
        assert!(err.to_string().starts_with("요청 처리 중 오류"));
    }
}
