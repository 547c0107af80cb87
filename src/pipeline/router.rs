//! Response router: one query in, one answer out

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::fallback::{GenerationSettings, GenerativeFallback};
use super::instant::InstantMatcher;
use super::retriever::{KnowledgeRetriever, Retrieval};
use crate::agent::llm::{GenerativeService, OllamaClient};
use crate::config::Config;
use crate::memory::{open_knowledge_store, KnowledgeRepository};
use crate::types::{ResolutionResult, ResponseSource};

/// Tries instant replies, then the knowledge base, then the model
///
/// Resolution never fails: every stage absorbs its own errors and the
/// generative stage always produces text.
pub struct ResponseRouter {
    instant: InstantMatcher,
    retriever: KnowledgeRetriever,
    fallback: GenerativeFallback,
}

impl ResponseRouter {
    pub fn new(instant: InstantMatcher, retriever: KnowledgeRetriever, fallback: GenerativeFallback) -> Self {
        Self {
            instant,
            retriever,
            fallback,
        }
    }

    /// Router over an existing repository and model service
    pub fn with_services(
        config: &Config,
        repository: Arc<dyn KnowledgeRepository>,
        service: Arc<dyn GenerativeService>,
    ) -> Self {
        let retriever =
            KnowledgeRetriever::with_threshold(repository, config.retrieval.similarity_threshold);
        let fallback = GenerativeFallback::new(
            service,
            GenerationSettings::from(config.generation.clone()),
        );
        Self::new(InstantMatcher::new(), retriever, fallback)
    }

    /// Open the configured knowledge database and model client
    ///
    /// An unopenable database only disables the knowledge stage.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = open_knowledge_store(&config.store.database_path).await;
        let client = OllamaClient::from_config(&config.generation)?;
        info!(
            "Router ready (store: {}, model: {})",
            config.store.database_path.display(),
            client.model()
        );
        Ok(Self::with_services(config, store, Arc::new(client)))
    }

    /// Answer `query` through the first stage that has something
    pub async fn resolve(&mut self, query: &str) -> ResolutionResult {
        let started = Instant::now();

        let (text, source) = if let Some(text) = self.instant.find(query) {
            (text, ResponseSource::Instant)
        } else {
            match self.retriever.retrieve(query).await {
                Retrieval::Cached(answer) => (answer, ResponseSource::Cache),
                Retrieval::Matched { answer, similarity } => {
                    debug!("Knowledge match at {:.3}", similarity);
                    (answer, ResponseSource::Knowledge)
                }
                Retrieval::Miss { similarity } => {
                    debug!("No knowledge match (best {:.3}), asking the model", similarity);
                    (self.fallback.generate(query).await, ResponseSource::Generative)
                }
            }
        };

        let elapsed = started.elapsed();
        info!("Resolved via {} in {:?}", source.as_tag(), elapsed);

        ResolutionResult { text, source, elapsed }
    }
}
