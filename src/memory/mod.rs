//! Knowledge memory for quick-assist
//!
//! Provides:
//! - The append-only question/answer repository contract
//! - SQLite-based persistence of learned answers
//! - An in-process store for ephemeral sessions
//! - A stand-in store for when the database cannot be opened
//! - TF-IDF vectorization used for similarity matching

pub mod sqlite;
pub mod volatile;
pub mod tfidf;
pub mod unavailable;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::error::Result;

pub use sqlite::SqliteKnowledgeStore;
pub use volatile::VolatileKnowledgeStore;
pub use tfidf::{TfidfVectorizer, cosine_similarity};
pub use unavailable::UnavailableKnowledgeStore;

/// A learned question with its canonical answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// The question as the user asked it
    pub question: String,
    /// The answer a human supplied for it
    pub answer: String,
    /// When the entry was stored (absent for seed files)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl KnowledgeEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            created_at: None,
        }
    }
}

/// Append-only question/answer store
///
/// Entries are never updated or deleted. `insert` reports failure as `false`
/// and never propagates an error past this boundary.
#[async_trait]
pub trait KnowledgeRepository: Send + Sync {
    /// All stored entries in insertion order
    async fn fetch_all(&self) -> Result<Vec<KnowledgeEntry>>;

    /// Append one entry, returning whether it was persisted
    async fn insert(&self, question: &str, answer: &str) -> bool;

    /// Number of stored entries
    async fn count(&self) -> Result<usize> {
        Ok(self.fetch_all().await?.len())
    }
}

/// Open the SQLite knowledge base at `path`
///
/// A database that cannot be opened degrades to [`UnavailableKnowledgeStore`],
/// so lookups become misses and nothing is learned, but chat keeps working.
pub async fn open_knowledge_store(path: &Path) -> Arc<dyn KnowledgeRepository> {
    match SqliteKnowledgeStore::new(path).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Knowledge store {} unavailable, continuing without it: {}", path.display(), e);
            Arc::new(UnavailableKnowledgeStore::new(e.to_string()))
        }
    }
}
