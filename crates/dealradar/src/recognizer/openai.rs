//! Chat-completions client for OpenAI-compatible endpoints.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::RecognizerConfig;
use crate::secrets::resolve_api_key;

use super::{CompletionClient, RecognitionError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body kept in [`RecognitionError::Api`].
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiCompletionClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompletionClient {
    /// Builds a client from config, resolving the API key immediately so a
    /// missing key is reported at startup rather than on first use.
    pub fn from_config(config: &RecognizerConfig) -> Result<Self, RecognitionError> {
        let api_key = resolve_api_key(config)?;
        Self::new(config, api_key)
    }

    pub fn new(config: &RecognizerConfig, api_key: SecretString) -> Result<Self, RecognitionError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                RecognitionError::Transport(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, RecognitionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!("Requesting completion from {} ({})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| RecognitionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = crate::sanitize::excerpt(body.trim(), MAX_ERROR_BODY).to_string();
            return Err(RecognitionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RecognitionError::Transport(format!("Invalid response body: {}", e)))?;

        extract_content(parsed)
    }
}

fn extract_content(response: ChatResponse) -> Result<String, RecognitionError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(RecognitionError::EmptyResponse)
}
