//! In-process knowledge store for ephemeral sessions

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{KnowledgeEntry, KnowledgeRepository};
use crate::error::Result;

/// Knowledge kept only for the lifetime of the process
#[derive(Default)]
pub struct VolatileKnowledgeStore {
    entries: RwLock<Vec<KnowledgeEntry>>,
}

impl VolatileKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a fixed set of question/answer pairs
    pub fn with_entries<I, Q, A>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Q, A)>,
        Q: Into<String>,
        A: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(q, a)| KnowledgeEntry::new(q, a))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl KnowledgeRepository for VolatileKnowledgeStore {
    async fn fetch_all(&self) -> Result<Vec<KnowledgeEntry>> {
        Ok(self.entries.read().await.clone())
    }

    async fn insert(&self, question: &str, answer: &str) -> bool {
        let mut entry = KnowledgeEntry::new(question, answer);
        entry.created_at = Some(Utc::now());
        self.entries.write().await.push(entry);
        true
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}
