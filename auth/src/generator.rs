use crate::{Credentials, Environment, Error, Token, DEFAULT_SCOPES, FALLBACK_CREDENTIALS_PATH};
use std::path::PathBuf;

/// Resolves one set of credentials and mints one token from it.
///
/// Nothing is cached: every call to [`Generator::generate`] repeats discovery and the
/// refresh exchange.
#[derive(Clone, Debug)]
pub struct Generator {
    client: reqwest::Client,
    environment: Environment,
    fallback_path: PathBuf,
}

impl Generator {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            environment: Environment::from_env(),
            fallback_path: PathBuf::from(FALLBACK_CREDENTIALS_PATH),
        }
    }

    pub fn with_environment(self, environment: Environment) -> Self {
        Self {
            environment,
            ..self
        }
    }

    pub fn with_fallback_path(self, fallback_path: impl Into<PathBuf>) -> Self {
        Self {
            fallback_path: fallback_path.into(),
            ..self
        }
    }

    /// Prefers ambient credentials; any discovery failure, whatever its kind, switches to
    /// the fallback key file.
    #[tracing::instrument(err, skip(self))]
    pub async fn resolve_credentials(&self) -> Result<Credentials, Error> {
        match self.environment.discover(&self.client).await {
            Ok(credentials) => Ok(credentials),
            Err(e) => {
                tracing::debug!(
                    "default credentials unavailable ({}), falling back to {}",
                    e,
                    self.fallback_path.display()
                );
                Credentials::from_file(&self.fallback_path).await
            }
        }
    }

    #[tracing::instrument(err, ret, skip(self))]
    pub async fn generate(&self) -> Result<Token, Error> {
        let credentials = self.resolve_credentials().await?;
        credentials.refresh(&self.client, DEFAULT_SCOPES).await
    }
}
