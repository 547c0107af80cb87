//! Quick Assist - chat assistant library
//!
//! Answers user text by consulting, in priority order:
//! - a table of instant replies (greetings, thanks, time and date)
//! - an in-memory cache of earlier knowledge hits
//! - a TF-IDF similarity search over the learned question/answer base
//! - a local language model (Ollama) as the last resort
//!
//! # Example
//!
//! ```ignore
//! use quick_assist::{Config, ResponseRouter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let mut router = ResponseRouter::from_config(&config).await?;
//!     let result = router.resolve("hola").await;
//!     println!("{} [{}]", result.text, result.source);
//!     Ok(())
//! }
//! ```

// Core modules (order matters for cross-module dependencies)
pub mod error;
pub mod types;
pub mod memory;
pub mod agent;
pub mod config;
pub mod pipeline;
pub mod cli;

// Re-export commonly used types for convenience
pub use error::AssistantError;

pub use types::{LineStyle, PendingRequest, ResolutionResult, ResponseSource};

pub use memory::{
    KnowledgeEntry,
    KnowledgeRepository,
    SqliteKnowledgeStore,
    VolatileKnowledgeStore,
};

pub use agent::llm::{GenerativeService, GenerationRequest, GenerationResponse, OllamaClient};

pub use config::Config;

pub use pipeline::{
    AsyncExecutor,
    ChatFrontend,
    GenerativeFallback,
    InstantMatcher,
    KnowledgeRetriever,
    LearningCoordinator,
    ResponseCache,
    ResponseRouter,
    Retrieval,
    SubmitOutcome,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library info
pub fn info() -> String {
    format!("{} v{} - Chat Assistant Library", NAME, VERSION)
}

/// Truncate a string at a char boundary, never splitting a multibyte character
pub fn truncate_safe(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
