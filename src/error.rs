//! Error types for the response pipeline
//!
//! Lower stages absorb their own failures and hand back "no answer" values;
//! only `Unexpected` ever reaches the executor's catch-all.

use thiserror::Error;

/// Failure taxonomy shared by the pipeline stages
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssistantError {
    /// The knowledge store could not be read or written
    #[error("Knowledge repository unavailable: {0}")]
    RepositoryUnavailable(String),

    /// The question corpus could not be turned into vectors (e.g. empty vocabulary)
    #[error("Vectorization failed: {0}")]
    VectorizationFailure(String),

    /// The language model server failed or returned something unusable
    #[error("Generative service failed: {0}")]
    GenerativeServiceFailure(String),

    /// Anything else that went wrong inside a resolution
    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, AssistantError>;

impl From<rusqlite::Error> for AssistantError {
    fn from(e: rusqlite::Error) -> Self {
        AssistantError::RepositoryUnavailable(e.to_string())
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(e: reqwest::Error) -> Self {
        AssistantError::GenerativeServiceFailure(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AssistantError::RepositoryUnavailable("disk is gone".to_string());
        assert_eq!(error.to_string(), "Knowledge repository unavailable: disk is gone");

        let error = AssistantError::VectorizationFailure("empty vocabulary".to_string());
        assert!(error.to_string().contains("empty vocabulary"));
    }

    #[test]
    fn test_sqlite_error_maps_to_repository() {
        let err: AssistantError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, AssistantError::RepositoryUnavailable(_)));
    }
}
