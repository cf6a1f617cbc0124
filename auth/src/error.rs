use reqwest::StatusCode;
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("[{status}] {body}")]
    Http { status: StatusCode, body: String },
    #[error("failed to load credentials from {}: {source}", path.display())]
    CredentialsFile {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
    #[error("could not find default credentials")]
    DefaultCredentialsNotFound,
    #[error("invalid credential source: {0}")]
    CredentialSource(String),
}

impl Error {
    pub(crate) async fn check_response(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, Self> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(Self::Http {
                status,
                body: summarize_body(&response.text().await?),
            })
        }
    }
}

// Error bodies are often pretty-printed JSON; keep them to one line.
fn summarize_body(body: &str) -> String {
    use serde_json::Value;

    let summary = match serde_json::from_str::<Value>(body) {
        // https://www.rfc-editor.org/rfc/rfc6749#section-5.2
        Ok(Value::Object(object)) => match (object.get("error"), object.get("error_description")) {
            (Some(Value::String(error)), Some(Value::String(description))) => {
                Some(format!("{error}: {description}"))
            }
            (Some(Value::String(error)), _) => Some(error.clone()),
            // https://cloud.google.com/apis/design/errors#http_mapping
            (Some(Value::Object(error)), _) => error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned),
            _ => None,
        },
        _ => None,
    };
    summary
        .as_deref()
        .unwrap_or(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
