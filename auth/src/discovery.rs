//! Application Default Credentials lookup.
//!
//! https://google.aip.dev/auth/4110

use crate::credentials::{Credentials, MetadataServer};
use crate::Error;
use std::env;
use std::path::PathBuf;

const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
const CLOUDSDK_CONFIG_ENV: &str = "CLOUDSDK_CONFIG";
const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";
const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const WELL_KNOWN_FILE: &str = "application_default_credentials.json";

/// The parts of the process environment that ambient discovery reads.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    pub credentials_file: Option<PathBuf>,
    pub gcloud_config_dir: Option<PathBuf>,
    pub metadata_host: Option<String>,
}

impl Environment {
    pub fn from_env() -> Self {
        Self {
            credentials_file: non_empty_var(CREDENTIALS_ENV).map(PathBuf::from),
            gcloud_config_dir: non_empty_var(CLOUDSDK_CONFIG_ENV)
                .map(PathBuf::from)
                .or_else(default_gcloud_config_dir),
            metadata_host: non_empty_var(METADATA_HOST_ENV),
        }
    }

    fn well_known_file(&self) -> Option<PathBuf> {
        self.gcloud_config_dir
            .as_ref()
            .map(|dir| dir.join(WELL_KNOWN_FILE))
    }

    fn metadata_server(&self) -> MetadataServer {
        MetadataServer::new(
            self.metadata_host
                .as_deref()
                .unwrap_or(DEFAULT_METADATA_HOST),
        )
    }

    /// Finds ambient credentials without exchanging them for a token.
    #[tracing::instrument(err, skip(client))]
    pub async fn discover(&self, client: &reqwest::Client) -> Result<Credentials, Error> {
        if let Some(path) = &self.credentials_file {
            return Credentials::from_file(path).await;
        }
        tracing::debug!("{} is unset", CREDENTIALS_ENV);

        if let Some(path) = self.well_known_file() {
            if path.is_file() {
                return Credentials::from_file(&path).await;
            }
            tracing::debug!("{} does not exist", path.display());
        }

        let metadata_server = self.metadata_server();
        if metadata_server.probe(client).await {
            return Ok(Credentials::MetadataServer(metadata_server));
        }

        Err(Error::DefaultCredentialsNotFound)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

#[cfg(windows)]
fn default_gcloud_config_dir() -> Option<PathBuf> {
    non_empty_var("APPDATA").map(|dir| PathBuf::from(dir).join("gcloud"))
}

#[cfg(not(windows))]
fn default_gcloud_config_dir() -> Option<PathBuf> {
    non_empty_var("HOME").map(|dir| PathBuf::from(dir).join(".config").join("gcloud"))
}
