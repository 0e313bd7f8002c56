use async_trait::async_trait;
use tracing::debug;

use super::{SecretStore, SecretValue, SecretsError};

/// Tries `primary` first and falls back to `secondary` when the primary has
/// no value for the name.
///
/// Only [`SecretsError::NotFound`] triggers the fallback; any other primary
/// failure is returned as-is.
pub struct FallbackSecretStore<P, S> {
    primary: P,
    secondary: S,
}

impl<P: SecretStore, S: SecretStore> FallbackSecretStore<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl<P: SecretStore, S: SecretStore> SecretStore for FallbackSecretStore<P, S> {
    async fn resolve(&self, name: &str) -> Result<SecretValue, SecretsError> {
        match self.primary.resolve(name).await {
            Err(SecretsError::NotFound { .. }) => {
                debug!(secret = name, "Not in primary store, trying fallback");
                self.secondary.resolve(name).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::StaticSecretStore;

    #[tokio::test]
    async fn test_primary_wins_then_fallback() {
        let store = FallbackSecretStore::new(
            StaticSecretStore::new().with("A", "primary"),
            StaticSecretStore::new().with("A", "secondary").with("B", "secondary"),
        );

        assert_eq!(store.resolve("A").await.unwrap().expose(), "primary");
        assert_eq!(store.resolve("B").await.unwrap().expose(), "secondary");
        assert!(matches!(
            store.resolve("C").await,
            Err(SecretsError::NotFound { .. })
        ));
    }
}
