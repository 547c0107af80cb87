//! Local language model client (Ollama chat API)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::GenerationConfig;
use crate::error::{AssistantError, Result};

/// Upper bound for the health check, independent of the generation timeout
const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(3);

/// One generation call: fixed instruction plus the user's text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_text: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Generated reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerationResponse {
    pub content: String,
}

/// Anything that can turn a request into generated text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Arc<Client>,
    base_url: String,
    model: String,
}

impl OllamaClient {
    /// Create a client for `model` served at `base_url`
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Create client from config
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Model tag this client generates with
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the Ollama server answers
    pub async fn is_available(&self) -> bool {
        let check = self.client
            .get(format!("{}/api/version", self.base_url))
            .timeout(AVAILABILITY_TIMEOUT)
            .send()
            .await;

        match check {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn build_body<'a>(&'a self, request: &'a GenerationRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &request.system_prompt },
                ChatMessage { role: "user", content: &request.user_text },
            ],
            stream: false,
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_output_tokens,
            },
        }
    }
}

/// Pull `message.content` out of a non-streaming chat response
fn extract_content(body: &str) -> Result<String> {
    let raw_response: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| {
            AssistantError::GenerativeServiceFailure(format!(
                "Failed to parse JSON response: {} (body: {})",
                e, crate::truncate_safe(body, 500)
            ))
        })?;

    let content = raw_response
        .get("message")
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    if content.is_empty() {
        return Err(AssistantError::GenerativeServiceFailure(
            "Response contained no message content".to_string(),
        ));
    }

    Ok(content)
}

#[async_trait]
impl GenerativeService for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let body = self.build_body(request);

        debug!("Sending generation request to {} ({})", self.base_url, self.model);
        let response = self.client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::GenerativeServiceFailure(format!(
                "Model server error ({}): {}",
                status,
                crate::truncate_safe(&body, 500)
            )));
        }

        let body = response.text().await?;
        Ok(GenerationResponse {
            content: extract_content(&body)?,
        })
    }
}
