mod authorized_user;
mod external_account;
mod metadata_server;
mod service_account;

pub(crate) use metadata_server::MetadataServer;

use crate::{Error, Token};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Credentials {
    AuthorizedUser(authorized_user::AuthorizedUser),
    ExternalAccount(external_account::ExternalAccount),
    ServiceAccount(service_account::ServiceAccount),
    #[serde(skip_deserializing)]
    MetadataServer(MetadataServer),
}

impl Credentials {
    #[tracing::instrument(err)]
    pub async fn from_file(path: &Path) -> Result<Self, Error> {
        tracing::debug!("loading credentials from {}", path.display());
        Self::parse(path).await.map_err(|e| Error::CredentialsFile {
            path: path.to_owned(),
            source: Box::new(e),
        })
    }

    async fn parse(path: &Path) -> Result<Self, Error> {
        Ok(serde_json::from_slice(&fs::read(path).await?)?)
    }

    #[tracing::instrument(err, ret, skip(client))]
    pub async fn refresh(&self, client: &reqwest::Client, scopes: &[&str]) -> Result<Token, Error> {
        match &self {
            Self::AuthorizedUser(credentials) => credentials.refresh(client, scopes).await,
            Self::ExternalAccount(credentials) => credentials.refresh(client, scopes).await,
            Self::ServiceAccount(credentials) => credentials.refresh(client, scopes).await,
            Self::MetadataServer(credentials) => credentials.refresh(client, scopes).await,
        }
    }
}
