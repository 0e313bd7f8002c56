//! Secret store collaborator.
//!
//! Routes only declare the secret names they need; the orchestrator resolves
//! the values through a [`SecretStore`] once per run. Implementations must
//! never log secret values, and [`SecretValue`] redacts itself in `Debug`.

mod env;
pub mod error;
mod fallback;
mod fixed;

pub use env::*;
pub use error::*;
pub use fallback::*;
pub use fixed::*;

use async_trait::async_trait;
use std::fmt;

/// A resolved secret. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(<redacted>)")
    }
}

/// Resolves secret values by name.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// # Errors
    /// [`SecretsError::NotFound`] if the store has no value for `name`.
    async fn resolve(&self, name: &str) -> Result<SecretValue, SecretsError>;
}

#[async_trait]
impl<S: SecretStore + ?Sized> SecretStore for std::sync::Arc<S> {
    async fn resolve(&self, name: &str) -> Result<SecretValue, SecretsError> {
        (**self).resolve(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_value_is_redacted() {
        let value = SecretValue::new("postgres://user:hunter2@db/calc");
        let printed = format!("{value:?}");
        assert!(!printed.contains("hunter2"));
        assert_eq!(value.expose(), "postgres://user:hunter2@db/calc");
    }
}
