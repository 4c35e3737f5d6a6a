//! Hosted model client - chat completions and embeddings over the
//! OpenAI-compatible HTTP API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

use crate::conversation::ChatEntry;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";
pub const FALLBACK_REPLY: &str = "Entschuldigung, ich konnte keine Antwort generieren.";

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 800,
            frequency_penalty: 0.1,
            presence_penalty: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Empty when the backend returned no choice.
    pub content: String,
    pub model: String,
    pub usage: Usage,
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        entries: &[ChatEntry],
        options: &CompletionOptions,
    ) -> Result<Completion, CompletionError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, CompletionError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatEntry],
    max_tokens: u32,
    temperature: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct OpenAiClient {
    api_base: String,
    api_key: String,
    embedding_model: String,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_base: &str, api_key: &str, embedding_model: &str, timeout: Duration) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            embedding_model: embedding_model.to_string(),
            http_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.api_base)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(
        &self,
        entries: &[ChatEntry],
        options: &CompletionOptions,
    ) -> Result<Completion, CompletionError> {
        debug!("Requesting completion with {} entries from {}", entries.len(), options.model);
        let request = ChatCompletionRequest {
            model: &options.model,
            messages: entries,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            frequency_penalty: options.frequency_penalty,
            presence_penalty: options.presence_penalty,
        };

        let response = self
            .http_client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Completion request failed: {}", e);
                CompletionError::GenerationFailed(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Completion endpoint returned {}: {}", status, body);
            return Err(CompletionError::GenerationFailed(format!("status {status}")));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            error!("Failed to parse completion response: {}", e);
            CompletionError::GenerationFailed(e.to_string())
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        Ok(Completion {
            content,
            model: completion.model.unwrap_or_else(|| options.model.clone()),
            usage: completion.usage.unwrap_or_default(),
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, CompletionError> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
            encoding_format: "float",
        };

        let response = self
            .http_client
            .post(self.embeddings_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::EmbeddingFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Embedding endpoint returned {}: {}", status, body);
            return Err(CompletionError::EmbeddingFailed(format!("status {status}")));
        }

        let embedding_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::EmbeddingFailed(e.to_string()))?;

        embedding_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| CompletionError::EmbeddingFailed("no embedding returned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Role;
    use mockito::Matcher;
    use serde_json::json;

    fn client(server: &mockito::ServerGuard) -> OpenAiClient {
        OpenAiClient::new(&server.url(), "sk-test", DEFAULT_EMBEDDING_MODEL, Duration::from_secs(5))
    }

    #[test]
    fn test_default_options() {
        let options = CompletionOptions::default();
        assert_eq!(options.model, "gpt-4o");
        assert_eq!(options.max_tokens, 800);
        assert!((options.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_complete_sends_request_and_reads_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o",
                "max_tokens": 800,
                "messages": [
                    { "role": "system", "content": "SYS" },
                    { "role": "user", "content": "Hallo" }
                ]
            })))
            .with_status(200)
            .with_body(
                json!({
                    "model": "gpt-4o-2024-08-06",
                    "choices": [{ "message": { "role": "assistant", "content": "Hallo zurück" } }],
                    "usage": { "prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14 }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let entries = vec![ChatEntry::new(Role::System, "SYS"), ChatEntry::new(Role::User, "Hallo")];
        let completion = client(&server)
            .complete(&entries, &CompletionOptions::default())
            .await
            .unwrap();

        assert_eq!(completion.content, "Hallo zurück");
        assert_eq!(completion.model, "gpt-4o-2024-08-06");
        assert_eq!(completion.usage.completion_tokens, 4);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_without_choices_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let completion = client(&server)
            .complete(&[], &CompletionOptions::default())
            .await
            .unwrap();
        assert!(completion.content.is_empty());
        assert_eq!(completion.model, "gpt-4o");
        assert_eq!(completion.usage, Usage::default());
    }

    #[tokio::test]
    async fn test_complete_error_status_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"error":{"message":"rate limited"}}"#)
            .create_async()
            .await;

        let result = client(&server).complete(&[], &CompletionOptions::default()).await;
        assert!(matches!(result, Err(CompletionError::GenerationFailed(_))));
    }

    #[tokio::test]
    async fn test_embed_returns_first_vector() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_body(Matcher::PartialJson(json!({
                "model": DEFAULT_EMBEDDING_MODEL,
                "input": "Text",
                "encoding_format": "float"
            })))
            .with_status(200)
            .with_body(r#"{"data":[{"embedding":[0.5,0.25,0.125]}]}"#)
            .create_async()
            .await;

        let embedding = client(&server).embed("Text").await.unwrap();
        assert_eq!(embedding, vec![0.5, 0.25, 0.125]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_empty_data_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;

        assert!(matches!(
            client(&server).embed("Text").await,
            Err(CompletionError::EmbeddingFailed(_))
        ));
    }
}
