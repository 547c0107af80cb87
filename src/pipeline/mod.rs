//! Response resolution pipeline
//!
//! Stages, in the order the router consults them:
//! - [`InstantMatcher`]: fixed replies for greetings, thanks, time and date
//! - [`KnowledgeRetriever`]: cached hits, then TF-IDF over learned entries
//! - [`GenerativeFallback`]: the local model, or a placeholder when it is down
//!
//! [`AsyncExecutor`] runs resolutions in the background for a chat frontend
//! and hands generated answers to the [`LearningCoordinator`].

pub mod cache;
pub mod instant;
pub mod retriever;
pub mod fallback;
pub mod router;
pub mod learning;
pub mod executor;

pub use cache::ResponseCache;
pub use instant::{ClockFormat, InstantMatcher, InstantRule, KeywordRule};
pub use retriever::{KnowledgeRetriever, Retrieval};
pub use fallback::{GenerationSettings, GenerativeFallback};
pub use router::ResponseRouter;
pub use learning::LearningCoordinator;
pub use executor::{AsyncExecutor, ChatFrontend, ExecutorSettings, ExecutorState, SubmitOutcome, WorkerReport};
