use thiserror::Error;

use crate::types::{Endpoint, SessionToken};

/// Failures reported by a diff engine implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("credentials required for endpoint {0}")]
    CredentialChallenge(Endpoint),

    #[error("authentication failed for endpoint {endpoint}: {reason}")]
    Authentication { endpoint: Endpoint, reason: String },

    #[error("{0}")]
    Failure(String),
}

/// Errors surfaced by the comparison orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompareError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("session '{0}' not found")]
    SessionNotFound(SessionToken),

    #[error("credentials required for endpoint {0}")]
    CredentialChallenge(Endpoint),

    #[error("authentication failed for endpoint {endpoint}: {reason}")]
    Authentication { endpoint: Endpoint, reason: String },

    #[error("diff engine error: {0}")]
    Engine(String),

    #[error("nothing to generate: selection is empty")]
    EmptySelection,

    #[error("comparison was canceled")]
    Canceled,

    #[error("request was superseded by a newer one")]
    Superseded,

    #[error("failed to render script: {0}")]
    Render(String),
}

impl CompareError {
    /// Only credential challenges are eligible for the automatic retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CompareError::CredentialChallenge(_))
    }
}

impl From<EngineError> for CompareError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::CredentialChallenge(endpoint) => CompareError::CredentialChallenge(endpoint),
            EngineError::Authentication { endpoint, reason } => {
                CompareError::Authentication { endpoint, reason }
            }
            EngineError::Failure(message) => CompareError::Engine(message),
        }
    }
}
