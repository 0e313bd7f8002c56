//! Error types for stage resolution.

use thiserror::Error;

/// The stage identifier is not one of the recognized deployment stages.
///
/// Resolution never falls back to a default stage: provisioning the wrong
/// domain/certificate pair against another stage's resources is worse than
/// aborting the run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid stage: '{input}' (expected one of: {expected})")]
pub struct InvalidStageError {
    /// The raw input that failed to match.
    pub input: String,
    /// Comma-separated list of recognized stages.
    pub expected: String,
}

impl InvalidStageError {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected: super::Stage::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}
