//! Error types for secret resolution.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecretsError {
    #[error("Secret not found: {name}")]
    NotFound { name: String },

    #[error("Invalid secret name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Secret store unavailable: {message}")]
    Unavailable { message: String },
}
