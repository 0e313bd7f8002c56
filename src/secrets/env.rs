use async_trait::async_trait;
use std::env;

use super::{SecretStore, SecretValue, SecretsError};

/// Default prefix for secrets read from the process environment.
pub const SECRET_ENV_PREFIX: &str = "DEPLOY_SECRET_";

/// Reads secrets from environment variables named `<prefix><NAME>`.
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    prefix: String,
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self::with_prefix(SECRET_ENV_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var_name(&self, name: &str) -> Result<String, SecretsError> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(SecretsError::InvalidName {
                name: name.to_string(),
                reason: "only ASCII letters, digits and '_' are allowed".to_string(),
            });
        }
        Ok(format!("{}{}", self.prefix, name.to_ascii_uppercase()))
    }
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn resolve(&self, name: &str) -> Result<SecretValue, SecretsError> {
        let var = self.var_name(name)?;
        match env::var(&var) {
            Ok(value) => Ok(SecretValue::new(value)),
            Err(_) => Err(SecretsError::NotFound {
                name: name.to_string(),
            }),
        }
    }
}
