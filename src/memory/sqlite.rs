//! SQLite-based persistent storage for learned answers

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{KnowledgeEntry, KnowledgeRepository};
use crate::error::{AssistantError, Result};

/// SQLite-based knowledge store
pub struct SqliteKnowledgeStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKnowledgeStore {
    /// Open (or create) the knowledge database at the given path
    pub async fn new<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let conn = Connection::open(&path)?;

        // Enable WAL mode for better performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(r#"
            -- Learned question/answer pairs, append-only
            CREATE TABLE IF NOT EXISTS knowledge (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
        "#)
    }

    async fn try_insert(&self, question: &str, answer: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO knowledge (question, answer, created_at) VALUES (?1, ?2, ?3)",
            params![question, answer, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[async_trait]
impl KnowledgeRepository for SqliteKnowledgeStore {
    async fn fetch_all(&self) -> Result<Vec<KnowledgeEntry>> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare_cached(
            "SELECT question, answer, created_at FROM knowledge ORDER BY id ASC"
        )?;

        let entries = stmt.query_map([], |row| {
            let created_at_str: String = row.get(2)?;
            Ok(KnowledgeEntry {
                question: row.get(0)?,
                answer: row.get(1)?,
                created_at: DateTime::parse_from_rfc3339(&created_at_str)
                    .map(|d| d.with_timezone(&Utc))
                    .ok(),
            })
        })?.collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("Fetched {} knowledge entries", entries.len());
        Ok(entries)
    }

    async fn insert(&self, question: &str, answer: &str) -> bool {
        match self.try_insert(question, answer).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to store knowledge entry: {}", e);
                false
            }
        }
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM knowledge", [], |row| row.get(0))
            .map_err(|e| AssistantError::RepositoryUnavailable(e.to_string()))?;
        Ok(count as usize)
    }
}
