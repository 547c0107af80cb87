//! Generative fallback: the local model answers when nothing else did

use std::sync::Arc;
use tracing::warn;

use crate::agent::llm::{GenerationRequest, GenerativeService};
use crate::config::GenerationConfig;

/// Fixed instruction and sampling settings for fallback generation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub system_prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationConfig::default().into()
    }
}

impl From<GenerationConfig> for GenerationSettings {
    fn from(config: GenerationConfig) -> Self {
        Self {
            system_prompt: config.system_prompt,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

/// Reply shown when the model server cannot answer
pub fn placeholder_reply(query: &str) -> String {
    format!(
        "💡 Basándome en tu pregunta sobre '{}', es un tema interesante. ¿Te gustaría que aprenda más sobre esto?",
        query
    )
}

/// Last pipeline stage; never fails
pub struct GenerativeFallback {
    service: Arc<dyn GenerativeService>,
    settings: GenerationSettings,
}

impl GenerativeFallback {
    pub fn new(service: Arc<dyn GenerativeService>, settings: GenerationSettings) -> Self {
        Self { service, settings }
    }

    /// Generated answer, or the placeholder on any service failure
    pub async fn generate(&self, query: &str) -> String {
        let request = GenerationRequest {
            system_prompt: self.settings.system_prompt.clone(),
            user_text: query.to_string(),
            temperature: self.settings.temperature,
            max_output_tokens: self.settings.max_output_tokens,
        };

        match self.service.generate(&request).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!("Model fallback failed, using placeholder: {}", e);
                placeholder_reply(query)
            }
        }
    }
}
