//! Stand-in repository used when the knowledge database cannot be opened

use async_trait::async_trait;
use tracing::debug;

use super::{KnowledgeEntry, KnowledgeRepository};
use crate::error::{AssistantError, Result};

/// Every read fails with `RepositoryUnavailable`, every write reports `false`
#[derive(Debug, Clone)]
pub struct UnavailableKnowledgeStore {
    reason: String,
}

impl UnavailableKnowledgeStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl KnowledgeRepository for UnavailableKnowledgeStore {
    async fn fetch_all(&self) -> Result<Vec<KnowledgeEntry>> {
        Err(AssistantError::RepositoryUnavailable(self.reason.clone()))
    }

    async fn insert(&self, _question: &str, _answer: &str) -> bool {
        debug!("Dropping knowledge entry, store unavailable: {}", self.reason);
        false
    }
}
