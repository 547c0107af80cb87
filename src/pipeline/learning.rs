//! Learning loop: turn human corrections into knowledge entries

use std::sync::Arc;
use tracing::{info, warn};

use crate::memory::KnowledgeRepository;
use crate::types::{ResolutionResult, ResponseSource};

/// Decides when to ask for a canonical answer and persists it
pub struct LearningCoordinator {
    repository: Arc<dyn KnowledgeRepository>,
    enabled: bool,
}

impl LearningCoordinator {
    pub fn new(repository: Arc<dyn KnowledgeRepository>, enabled: bool) -> Self {
        Self { repository, enabled }
    }

    /// Only model-generated answers are offered for correction
    pub fn should_prompt(&self, result: &ResolutionResult) -> bool {
        self.enabled && result.source == ResponseSource::Generative
    }

    /// Store `answer` for `question`; blank answers are ignored
    pub async fn learn(&self, question: &str, answer: &str) -> bool {
        let answer = answer.trim();
        if answer.is_empty() {
            return false;
        }

        let stored = self.repository.insert(question, answer).await;
        if stored {
            info!("Learned new answer ({} chars)", answer.chars().count());
        } else {
            warn!("Failed to store learned answer");
        }
        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VolatileKnowledgeStore;
    use std::time::Duration;

    fn result(source: ResponseSource) -> ResolutionResult {
        ResolutionResult {
            text: "respuesta".to_string(),
            source,
            elapsed: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_prompt_only_after_generated_answers() {
        let store = Arc::new(VolatileKnowledgeStore::new());
        let learning = LearningCoordinator::new(store, true);

        assert!(learning.should_prompt(&result(ResponseSource::Generative)));
        assert!(!learning.should_prompt(&result(ResponseSource::Instant)));
        assert!(!learning.should_prompt(&result(ResponseSource::Cache)));
        assert!(!learning.should_prompt(&result(ResponseSource::Knowledge)));
    }

    #[test]
    fn test_disabled_never_prompts() {
        let learning = LearningCoordinator::new(Arc::new(VolatileKnowledgeStore::new()), false);
        assert!(!learning.should_prompt(&result(ResponseSource::Generative)));
    }

    #[tokio::test]
    async fn test_learn_trims_and_stores() {
        let store = Arc::new(VolatileKnowledgeStore::new());
        let learning = LearningCoordinator::new(store.clone(), true);

        assert!(learning.learn("qué es tokio", "  Un runtime asíncrono  ").await);

        let entries = store.fetch_all().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].question, "qué es tokio");
        assert_eq!(entries[0].answer, "Un runtime asíncrono");
    }

    #[tokio::test]
    async fn test_blank_answer_is_not_stored() {
        let store = Arc::new(VolatileKnowledgeStore::new());
        let learning = LearningCoordinator::new(store.clone(), true);

        assert!(!learning.learn("qué es tokio", "   \n").await);
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
