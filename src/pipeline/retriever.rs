//! Similarity search over the learned knowledge base

use std::sync::Arc;
use tracing::{debug, warn};

use super::cache::ResponseCache;
use crate::config::DEFAULT_SIMILARITY_THRESHOLD;
use crate::memory::{tfidf, KnowledgeRepository};

/// Outcome of a knowledge lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// Served from the response cache (similarity 1.0, no vectorization)
    Cached(String),
    /// Stored answer whose question scored above the threshold
    Matched { answer: String, similarity: f32 },
    /// Nothing trustworthy; carries the best score seen
    Miss { similarity: f32 },
}

impl Retrieval {
    pub fn answer(&self) -> Option<&str> {
        match self {
            Retrieval::Cached(answer) | Retrieval::Matched { answer, .. } => Some(answer),
            Retrieval::Miss { .. } => None,
        }
    }

    pub fn similarity(&self) -> f32 {
        match self {
            Retrieval::Cached(_) => 1.0,
            Retrieval::Matched { similarity, .. } | Retrieval::Miss { similarity } => *similarity,
        }
    }
}

/// TF-IDF retriever in front of a knowledge repository
pub struct KnowledgeRetriever {
    repository: Arc<dyn KnowledgeRepository>,
    cache: ResponseCache,
    threshold: f32,
}

impl KnowledgeRetriever {
    pub fn new(repository: Arc<dyn KnowledgeRepository>) -> Self {
        Self::with_threshold(repository, DEFAULT_SIMILARITY_THRESHOLD)
    }

    pub fn with_threshold(repository: Arc<dyn KnowledgeRepository>, threshold: f32) -> Self {
        Self {
            repository,
            cache: ResponseCache::new(),
            threshold,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Look `query` up in the cache, then in the knowledge base
    ///
    /// Repository and vectorization failures are absorbed as a miss with
    /// similarity 0.0.
    pub async fn retrieve(&mut self, query: &str) -> Retrieval {
        if let Some(cached) = self.cache.get(query) {
            debug!("Cache hit for query");
            return Retrieval::Cached(cached.to_string());
        }

        let entries = match self.repository.fetch_all().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Knowledge lookup skipped: {}", e);
                return Retrieval::Miss { similarity: 0.0 };
            }
        };

        if entries.is_empty() {
            return Retrieval::Miss { similarity: 0.0 };
        }

        let questions: Vec<&str> = entries.iter().map(|e| e.question.as_str()).collect();
        let scores = match tfidf::similarities(query, &questions) {
            Ok(scores) => scores,
            Err(e) => {
                warn!("Knowledge lookup skipped: {}", e);
                return Retrieval::Miss { similarity: 0.0 };
            }
        };

        // First maximum wins, so earlier entries take ties
        let mut best = 0;
        for (index, score) in scores.iter().enumerate() {
            if *score > scores[best] {
                best = index;
            }
        }
        let similarity = scores[best];
        debug!("Best knowledge match #{} with similarity {:.3}", best, similarity);

        if similarity > self.threshold {
            let answer = entries[best].answer.clone();
            self.cache.put(query, answer.clone());
            Retrieval::Matched { answer, similarity }
        } else {
            Retrieval::Miss { similarity }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AssistantError, Result};
    use crate::memory::{KnowledgeEntry, VolatileKnowledgeStore};
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl KnowledgeRepository for BrokenStore {
        async fn fetch_all(&self) -> Result<Vec<KnowledgeEntry>> {
            Err(AssistantError::RepositoryUnavailable("connection refused".to_string()))
        }

        async fn insert(&self, _question: &str, _answer: &str) -> bool {
            false
        }
    }

    fn retriever(pairs: &[(&str, &str)]) -> KnowledgeRetriever {
        let store = VolatileKnowledgeStore::with_entries(pairs.iter().copied());
        KnowledgeRetriever::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_exact_question_matches_and_is_cached() {
        let mut retriever = retriever(&[("what time is it", "ask the clock")]);

        let result = retriever.retrieve("what time is it").await;
        assert_eq!(result.answer(), Some("ask the clock"));
        assert!((result.similarity() - 1.0).abs() < 1e-5);
        assert_eq!(retriever.cache().get("WHAT TIME IS IT"), Some("ask the clock"));

        assert_eq!(
            retriever.retrieve("  What Time Is It ").await,
            Retrieval::Cached("ask the clock".to_string())
        );
    }

    #[tokio::test]
    async fn test_zero_overlap_scores_exactly_zero() {
        let mut retriever = retriever(&[("what is your name", "Assistant")]);

        let result = retriever.retrieve("tell me a joke").await;
        assert_eq!(result, Retrieval::Miss { similarity: 0.0 });
        assert!(retriever.cache().is_empty());
    }

    #[tokio::test]
    async fn test_weak_overlap_stays_below_threshold() {
        let mut retriever = retriever(&[("what is your name", "Assistant")]);

        let result = retriever.retrieve("tell me a name").await;
        assert_eq!(result.answer(), None);
        assert!(result.similarity() > 0.0);
        assert!(result.similarity() <= 0.45);
    }

    #[tokio::test]
    async fn test_best_of_several_questions() {
        let mut retriever = retriever(&[
            ("qué es rust", "Un lenguaje de sistemas"),
            ("cómo instalar rust en linux", "Usa rustup"),
            ("qué es una base de datos", "Un almacén organizado de datos"),
        ]);

        let result = retriever.retrieve("cómo instalo rust en linux").await;
        assert_eq!(result.answer(), Some("Usa rustup"));
    }

    #[tokio::test]
    async fn test_empty_repository_is_a_miss() {
        let mut retriever = retriever(&[]);
        assert_eq!(retriever.retrieve("hola").await, Retrieval::Miss { similarity: 0.0 });
    }

    #[tokio::test]
    async fn test_unreachable_repository_is_a_miss() {
        let mut retriever = KnowledgeRetriever::new(Arc::new(BrokenStore));
        assert_eq!(retriever.retrieve("anything").await, Retrieval::Miss { similarity: 0.0 });
    }

    #[tokio::test]
    async fn test_empty_vocabulary_is_a_miss() {
        let mut retriever = retriever(&[("?", "nada")]);
        assert_eq!(retriever.retrieve("!").await, Retrieval::Miss { similarity: 0.0 });
    }

    #[tokio::test]
    async fn test_custom_threshold() {
        let store = VolatileKnowledgeStore::with_entries([("what is your name", "Assistant")]);
        let mut retriever = KnowledgeRetriever::with_threshold(Arc::new(store), 0.1);
        assert_eq!(retriever.threshold(), 0.1);

        let result = retriever.retrieve("tell me a name").await;
        assert_eq!(result.answer(), Some("Assistant"));
    }
}
