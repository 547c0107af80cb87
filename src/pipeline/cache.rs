//! Response cache for repeated knowledge hits

use std::collections::HashMap;

/// Normalized query -> answer, kept for the process lifetime
///
/// Keys are lower-cased and trimmed, so lookups ignore casing and
/// surrounding whitespace. Nothing is ever evicted.
#[derive(Debug, Default, Clone)]
pub struct ResponseCache {
    entries: HashMap<String, String>,
}

/// Cache key form of a query
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, query: &str) -> Option<&str> {
        self.entries.get(&normalize_query(query)).map(String::as_str)
    }

    /// Store `answer`, replacing any previous answer for the same query
    pub fn put(&mut self, query: &str, answer: impl Into<String>) {
        self.entries.insert(normalize_query(query), answer.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
