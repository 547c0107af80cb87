//! Shared types used across modules
//!
//! This module contains types that are used by multiple modules
//! to avoid circular dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pipeline stage that produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseSource {
    Instant,
    Cache,
    Knowledge,
    Generative,
}

impl ResponseSource {
    /// Short lowercase tag, used in logs and the `ask` command output
    pub fn as_tag(&self) -> &'static str {
        match self {
            ResponseSource::Instant => "instant",
            ResponseSource::Cache => "cache",
            ResponseSource::Knowledge => "knowledge",
            ResponseSource::Generative => "generative",
        }
    }
}

impl std::fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseSource::Instant => write!(f, "Instant"),
            ResponseSource::Cache => write!(f, "Cache"),
            ResponseSource::Knowledge => write!(f, "Knowledge"),
            ResponseSource::Generative => write!(f, "Generative"),
        }
    }
}

/// Outcome of one resolution, handed to the UI and then discarded
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    pub text: String,
    pub source: ResponseSource,
    pub elapsed: Duration,
}

impl ResolutionResult {
    /// Transcript line: `"<answer> (<elapsed>)"`
    pub fn display_line(&self) -> String {
        format!("{} ({:.1}s)", self.text, self.elapsed.as_secs_f64())
    }
}

/// The single request an executor may have in flight
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub id: uuid::Uuid,
    pub query: String,
    pub submitted_at: DateTime<Utc>,
}

impl PendingRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            query: query.into(),
            submitted_at: Utc::now(),
        }
    }
}

/// Style tag attached to every transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStyle {
    User,
    Bot,
    System,
    Error,
}

impl std::fmt::Display for LineStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineStyle::User => write!(f, "user"),
            LineStyle::Bot => write!(f, "bot"),
            LineStyle::System => write!(f, "system"),
            LineStyle::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_line_includes_elapsed() {
        let result = ResolutionResult {
            text: "Hola".to_string(),
            source: ResponseSource::Instant,
            elapsed: Duration::from_millis(1300),
        };
        assert_eq!(result.display_line(), "Hola (1.3s)");
    }

    #[test]
    fn test_source_tags() {
        assert_eq!(ResponseSource::Cache.as_tag(), "cache");
        assert_eq!(ResponseSource::Generative.to_string(), "Generative");
    }
}
