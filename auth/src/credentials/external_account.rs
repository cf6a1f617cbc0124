// https://google.aip.dev/auth/4117

use crate::{Error, Token};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_with::formats::SpaceSeparator;
use serde_with::StringWithSeparator;
use std::collections::HashMap;
use tokio::fs;

const TOKEN_EXCHANGE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
const ACCESS_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:access_token";

#[derive(Debug, Deserialize)]
pub struct ExternalAccount {
    pub audience: String,
    pub subject_token_type: String,
    pub service_account_impersonation_url: Option<String>,
    pub token_url: String,
    pub credential_source: CredentialSource,
}

#[derive(Debug, Deserialize)]
pub struct CredentialSource {
    #[serde(flatten)]
    pub location: Location,
    #[serde(default)]
    pub format: Format,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Location {
    File {
        file: String,
    },
    Url {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Format {
    #[default]
    Text,
    Json {
        subject_token_field_name: String,
    },
}

impl CredentialSource {
    #[tracing::instrument(err, skip(client))]
    async fn subject_token(&self, client: &reqwest::Client) -> Result<String, Error> {
        let raw = match &self.location {
            Location::File { file } => fs::read_to_string(file).await?,
            Location::Url { url, headers } => {
                let mut request = client.get(url);
                for (name, value) in headers {
                    request = request.header(name, value);
                }
                Error::check_response(request.send().await?)
                    .await?
                    .text()
                    .await?
            }
        };
        match &self.format {
            Format::Text => Ok(raw),
            Format::Json {
                subject_token_field_name,
            } => serde_json::from_str::<serde_json::Value>(&raw)?
                .get(subject_token_field_name)
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| {
                    Error::CredentialSource(format!(
                        "missing string field {subject_token_field_name:?}"
                    ))
                }),
        }
    }
}

impl ExternalAccount {
    #[tracing::instrument(err, ret, skip(client))]
    pub async fn refresh(&self, client: &reqwest::Client, scopes: &[&str]) -> Result<Token, Error> {
        let subject_token = self.credential_source.subject_token(client).await?;

        let now = Utc::now();
        let response = {
            // https://cloud.google.com/iam/docs/reference/sts/rest/v1/TopLevel/token#request-body
            #[serde_with::serde_as]
            #[derive(Serialize)]
            #[serde(rename_all = "camelCase")]
            struct Request<'a> {
                grant_type: &'a str,
                audience: &'a str,
                #[serde_as(as = "StringWithSeparator::<SpaceSeparator, &str>")]
                scope: Vec<&'a str>,
                requested_token_type: &'a str,
                subject_token: &'a str,
                subject_token_type: &'a str,
            }

            // https://cloud.google.com/iam/docs/reference/sts/rest/v1/TopLevel/token#response-body
            #[derive(Deserialize)]
            struct Response {
                access_token: String,
                expires_in: i64,
            }

            Error::check_response(
                client
                    .post(&self.token_url)
                    .json(&Request {
                        grant_type: TOKEN_EXCHANGE_GRANT_TYPE,
                        audience: &self.audience,
                        requested_token_type: ACCESS_TOKEN_TYPE,
                        subject_token_type: &self.subject_token_type,
                        scope: if self.service_account_impersonation_url.is_some() {
                            crate::DEFAULT_SCOPES
                        } else {
                            scopes
                        }
                        .into(),
                        subject_token: &subject_token,
                    })
                    .send()
                    .await?,
            )
            .await?
            .json::<Response>()
            .await?
        };

        if let Some(service_account_impersonation_url) = &self.service_account_impersonation_url {
            let response = {
                // https://cloud.google.com/iam/docs/reference/credentials/rest/v1/projects.serviceAccounts/generateAccessToken#request-body
                #[derive(Serialize)]
                #[serde(rename_all = "camelCase")]
                struct Request<'a> {
                    scope: &'a [&'a str],
                    lifetime: &'a str,
                }

                // https://cloud.google.com/iam/docs/reference/credentials/rest/v1/projects.serviceAccounts/generateAccessToken#response-body
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct Response {
                    access_token: String,
                    expire_time: DateTime<Utc>,
                }

                Error::check_response(
                    client
                        .post(service_account_impersonation_url)
                        .bearer_auth(&response.access_token)
                        .json(&Request {
                            scope: scopes,
                            lifetime: "3600s",
                        })
                        .send()
                        .await?,
                )
                .await?
                .json::<Response>()
                .await?
            };

            Ok(Token {
                access_token: response.access_token,
                expires_at: response.expire_time,
            })
        } else {
            Ok(Token {
                access_token: response.access_token,
                expires_at: now + Duration::seconds(response.expires_in),
            })
        }
    }
}
