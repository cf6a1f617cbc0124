// https://google.aip.dev/auth/4113

use crate::{Error, Token};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_with::formats::SpaceSeparator;
use serde_with::StringWithSeparator;
use std::fmt;

#[derive(Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    crate::DEFAULT_TOKEN_URI.to_owned()
}

impl fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("client_id", &self.client_id)
            .field("client_secret", &crate::SENSITIVE)
            .field("refresh_token", &crate::SENSITIVE)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl AuthorizedUser {
    #[tracing::instrument(err, ret, skip(client))]
    pub async fn refresh(&self, client: &reqwest::Client, scopes: &[&str]) -> Result<Token, Error> {
        let now = Utc::now();
        let response = {
            #[serde_with::serde_as]
            #[derive(Serialize)]
            struct Request<'a> {
                grant_type: &'a str,
                client_id: &'a str,
                client_secret: &'a str,
                refresh_token: &'a str,
                #[serde_as(as = "StringWithSeparator::<SpaceSeparator, &str>")]
                scope: Vec<&'a str>,
            }

            #[derive(Deserialize)]
            struct Response {
                access_token: String,
                expires_in: i64,
            }

            Error::check_response(
                client
                    .post(&self.token_uri)
                    .form(&Request {
                        grant_type: "refresh_token",
                        client_id: &self.client_id,
                        client_secret: &self.client_secret,
                        refresh_token: &self.refresh_token,
                        scope: scopes.into(),
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
            expires_at: now + Duration::seconds(response.expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::AuthorizedUser;
    use crate::{Error, DEFAULT_SCOPES};
    use chrono::Utc;
    use httptest::matchers::{all_of, contains, request, url_decoded};
    use httptest::responders::{json_encoded, status_code};
    use httptest::{Expectation, Server};
    use serde_json::json;

    fn credentials(server: &Server) -> AuthorizedUser {
        serde_json::from_value(json!({
            "client_id": "id.apps.googleusercontent.com",
            "client_secret": "secret",
            "refresh_token": "1//refresh",
            "token_uri": server.url("/token").to_string(),
        }))
        .unwrap()
    }

    #[test]
    fn token_uri_defaults_to_google() {
        let credentials: AuthorizedUser = serde_json::from_value(json!({
            "client_id": "id",
            "client_secret": "secret",
            "refresh_token": "refresh",
        }))
        .unwrap();
        assert_eq!(credentials.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[tokio::test]
    async fn refresh_posts_refresh_token_grant() -> anyhow::Result<()> {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/token"),
                request::body(url_decoded(contains(("grant_type", "refresh_token")))),
                request::body(url_decoded(contains(("refresh_token", "1//refresh")))),
                request::body(url_decoded(contains((
                    "scope",
                    "https://www.googleapis.com/auth/cloud-platform"
                )))),
            ])
            .respond_with(json_encoded(json!({
                "access_token": "ya29.user",
                "expires_in": 3599,
                "token_type": "Bearer",
            }))),
        );

        let before = Utc::now();
        let token = credentials(&server)
            .refresh(&reqwest::Client::new(), DEFAULT_SCOPES)
            .await?;
        assert_eq!(token.access_token, "ya29.user");
        assert!(token.expires_at > before);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_surfaces_provider_rejection() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/token"))
                .respond_with(status_code(400).body(r#"{"error":"invalid_grant"}"#)),
        );

        let e = credentials(&server)
            .refresh(&reqwest::Client::new(), DEFAULT_SCOPES)
            .await
            .unwrap_err();
        assert!(matches!(&e, Error::Http { status, .. } if status.as_u16() == 400));
        assert!(e.to_string().contains("invalid_grant"));
    }
}
