// https://developers.google.com/identity/protocols/oauth2/service-account#authorizingrequests

use crate::{Error, Token};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;

const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
// Assertions with `iat` in the future are rejected, so backdate to absorb clock skew.
const CLOCK_SKEW_SECONDS: i64 = 10;
const ASSERTION_LIFETIME_SECONDS: i64 = 3600;

#[derive(Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    crate::DEFAULT_TOKEN_URI.to_owned()
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key", &crate::SENSITIVE)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl ServiceAccount {
    fn assertion(&self, scopes: &[&str]) -> Result<String, Error> {
        let issued_at = Utc::now() - Duration::seconds(CLOCK_SKEW_SECONDS);
        let claims = Claims {
            iss: &self.client_email,
            scope: scopes.join(" "),
            aud: &self.token_uri,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::seconds(ASSERTION_LIFETIME_SECONDS)).timestamp(),
        };
        let header = Header {
            kid: self.private_key_id.clone(),
            ..Header::new(Algorithm::RS256)
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        Ok(jsonwebtoken::encode(&header, &claims, &key)?)
    }

    #[tracing::instrument(err, ret, skip(client))]
    pub async fn refresh(&self, client: &reqwest::Client, scopes: &[&str]) -> Result<Token, Error> {
        let assertion = self.assertion(scopes)?;

        let now = Utc::now();
        let response = {
            #[derive(Serialize)]
            struct Request<'a> {
                grant_type: &'a str,
                assertion: &'a str,
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
                        grant_type: JWT_BEARER_GRANT_TYPE,
                        assertion: &assertion,
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
