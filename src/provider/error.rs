//! Errors reported by cloud provider collaborators.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider's request channel is closed.
    #[error("Provider closed")]
    Closed,

    /// The provider dropped the response channel before answering.
    #[error("Provider dropped response channel")]
    Dropped,

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The resource already exists in a state that conflicts with the request.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The provider refused the request.
    #[error("Rejected: {0}")]
    Rejected(String),
}
