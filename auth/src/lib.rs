mod credentials;
mod discovery;
mod error;
mod generator;
mod token;

pub use credentials::Credentials;
pub use discovery::Environment;
pub use error::Error;
pub use generator::Generator;
pub use token::Token;

pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];
pub const FALLBACK_CREDENTIALS_PATH: &str = "./secrets/gcp_credentials.json";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SENSITIVE: &str = "***";

/// Mints a token for [`DEFAULT_SCOPES`], trying Application Default Credentials
/// first and [`FALLBACK_CREDENTIALS_PATH`] second.
pub async fn generate_access_token(client: &reqwest::Client) -> Result<Token, Error> {
    Generator::new(client.clone()).generate().await
}
