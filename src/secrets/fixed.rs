use async_trait::async_trait;
use std::collections::HashMap;

use super::{SecretStore, SecretValue, SecretsError};

/// In-memory secret store with a fixed set of values.
///
/// Used for `--secret NAME=VALUE` overrides and in tests.
#[derive(Clone, Default)]
pub struct StaticSecretStore {
    values: HashMap<String, SecretValue>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), SecretValue::new(value));
    }

    /// Parses a `NAME=VALUE` pair. The value may itself contain `=`.
    pub fn parse_pair(pair: &str) -> Result<(String, String), SecretsError> {
        match pair.split_once('=') {
            Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
            _ => Err(SecretsError::InvalidName {
                name: pair.split('=').next().unwrap_or_default().to_string(),
                reason: "expected NAME=VALUE".to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn resolve(&self, name: &str) -> Result<SecretValue, SecretsError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| SecretsError::NotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_known_and_unknown() {
        let store = StaticSecretStore::new().with("POSTGRES_URL", "postgres://db");
        assert_eq!(
            store.resolve("POSTGRES_URL").await.unwrap().expose(),
            "postgres://db"
        );
        assert_eq!(
            store.resolve("MISSING").await,
            Err(SecretsError::NotFound {
                name: "MISSING".to_string()
            })
        );
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            StaticSecretStore::parse_pair("URL=postgres://u:p@h/db?a=b").unwrap(),
            ("URL".to_string(), "postgres://u:p@h/db?a=b".to_string())
        );
        assert!(StaticSecretStore::parse_pair("=value").is_err());
        assert!(StaticSecretStore::parse_pair("novalue").is_err());
    }
}
