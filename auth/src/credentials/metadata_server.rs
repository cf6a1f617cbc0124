// https://cloud.google.com/compute/docs/access/authenticate-workloads#applications

use crate::{Error, Token};
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::time;

const METADATA_FLAVOR: &str = "metadata-flavor";
const METADATA_FLAVOR_VALUE: &str = "Google";
const PROBE_TIMEOUT: time::Duration = time::Duration::from_secs(3);

#[derive(Debug)]
pub struct MetadataServer {
    root: String,
}

impl MetadataServer {
    pub fn new(host: &str) -> Self {
        Self {
            root: format!("http://{host}/computeMetadata/v1"),
        }
    }

    /// Returns whether a metadata server answers at this address.
    #[tracing::instrument(ret, skip(client))]
    pub async fn probe(&self, client: &reqwest::Client) -> bool {
        let response = client
            .get(format!("{}/", self.root))
            .header(METADATA_FLAVOR, METADATA_FLAVOR_VALUE)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;
        match response {
            Ok(response) => response
                .headers()
                .get(METADATA_FLAVOR)
                .is_some_and(|value| value == METADATA_FLAVOR_VALUE),
            Err(e) => {
                tracing::debug!("metadata server is unavailable: {}", e);
                false
            }
        }
    }

    #[tracing::instrument(err, ret, skip(client))]
    pub async fn refresh(&self, client: &reqwest::Client, scopes: &[&str]) -> Result<Token, Error> {
        let now = Utc::now();
        let response = {
            #[derive(Deserialize)]
            struct Response {
                access_token: String,
                expires_in: i64,
            }

            Error::check_response(
                client
                    .get(format!(
                        "{}/instance/service-accounts/default/token",
                        self.root
                    ))
                    .header(METADATA_FLAVOR, METADATA_FLAVOR_VALUE)
                    .query(&[("scopes", scopes.join(","))])
                    .send()
                    .await?,
            )
            .await?
            .json::<Response>()
            .await?
        };
        Ok(Token {
            access_token: response.access_token,
            expires_at: now + Duration::seconds(response.expires_in),
        })
    }
}
