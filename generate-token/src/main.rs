use std::io;
use std::process::ExitCode;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

async fn run() -> anyhow::Result<String> {
    let client = reqwest::Client::new();
    let token = gcp_token_auth::generate_access_token(&client).await?;
    Ok(token.access_token)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::OFF.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();

    match run().await {
        Ok(access_token) => {
            println!("{access_token}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::debug!("{:?}", e);
            eprintln!("Error generating access token: {e}");
            ExitCode::FAILURE
        }
    }
}
