use httptest::matchers::{all_of, contains, request, url_decoded};
use httptest::responders::{json_encoded, status_code};
use httptest::{Expectation, Server};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const PRIVATE_KEY: &str = include_str!("../../auth/src/testdata/test_key.pem");

fn service_account(server: &Server) -> String {
    json!({
        "type": "service_account",
        "project_id": "test-project",
        "private_key_id": "test-key-id",
        "private_key": PRIVATE_KEY,
        "client_email": "generator@test-project.iam.gserviceaccount.com",
        "token_uri": server.url("/token").to_string(),
    })
    .to_string()
}

fn authorized_user(server: &Server) -> String {
    json!({
        "type": "authorized_user",
        "client_id": "id",
        "client_secret": "secret",
        "refresh_token": "refresh",
        "token_uri": server.url("/token").to_string(),
    })
    .to_string()
}

fn write_fallback(workdir: &Path, contents: &str) {
    let secrets = workdir.join("secrets");
    fs::create_dir_all(&secrets).unwrap();
    fs::write(secrets.join("gcp_credentials.json"), contents).unwrap();
}

// Runs the binary with ambient discovery pointed at the mock server and an empty gcloud
// config directory.
fn generate_token(server: &Server, workdir: &Path, credentials_file: Option<&Path>) -> Output {
    server.expect(
        Expectation::matching(request::method_path("GET", "/computeMetadata/v1/"))
            .times(0..)
            .respond_with(status_code(404)),
    );
    let gcloud = workdir.join("gcloud");
    fs::create_dir_all(&gcloud).unwrap();

    let mut command = Command::new(env!("CARGO_BIN_EXE_generate-token"));
    command
        .current_dir(workdir)
        .env_remove("GOOGLE_APPLICATION_CREDENTIALS")
        .env_remove("RUST_LOG")
        .env("CLOUDSDK_CONFIG", &gcloud)
        .env("GCE_METADATA_HOST", server.addr().to_string());
    if let Some(path) = credentials_file {
        command.env("GOOGLE_APPLICATION_CREDENTIALS", path);
    }
    command.output().unwrap()
}

fn token_response(grant_type: &'static str, access_token: &str) -> Expectation {
    Expectation::matching(all_of![
        request::method_path("POST", "/token"),
        request::body(url_decoded(contains(("grant_type", grant_type)))),
    ])
    .respond_with(json_encoded(json!({
        "access_token": access_token,
        "expires_in": 3599,
        "token_type": "Bearer",
    })))
}

#[test]
fn prints_ambient_token() {
    let workdir = tempfile::tempdir().unwrap();
    let server = Server::run();
    let adc = workdir.path().join("adc.json");
    fs::write(&adc, authorized_user(&server)).unwrap();
    write_fallback(workdir.path(), "not json");
    server.expect(token_response("refresh_token", "ya29.ambient"));

    let output = generate_token(&server, workdir.path(), Some(&adc));
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "ya29.ambient\n");
    assert!(output.stderr.is_empty());
}

#[test]
fn prints_fallback_token() {
    let workdir = tempfile::tempdir().unwrap();
    let server = Server::run();
    write_fallback(workdir.path(), &service_account(&server));
    server.expect(token_response(
        "urn:ietf:params:oauth:grant-type:jwt-bearer",
        "ya29.fallback",
    ));

    let output = generate_token(&server, workdir.path(), None);
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "ya29.fallback\n");
}

#[test]
fn missing_fallback_exits_with_error() {
    let workdir = tempfile::tempdir().unwrap();
    let server = Server::run();

    let output = generate_token(&server, workdir.path(), None);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    let message = stderr
        .strip_prefix("Error generating access token: ")
        .unwrap();
    assert!(!message.trim().is_empty());
    assert_eq!(stderr.lines().count(), 1);
}

#[test]
fn invalid_fallback_exits_with_error() {
    let workdir = tempfile::tempdir().unwrap();
    let server = Server::run();
    write_fallback(workdir.path(), r#"{"type": "service_account"}"#);

    let output = generate_token(&server, workdir.path(), None);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.starts_with(
        "Error generating access token: failed to load credentials from ./secrets/gcp_credentials.json: "
    ));
}

#[test]
fn refresh_failure_exits_with_error() {
    let workdir = tempfile::tempdir().unwrap();
    let server = Server::run();
    let adc = workdir.path().join("adc.json");
    fs::write(&adc, authorized_user(&server)).unwrap();
    write_fallback(workdir.path(), &service_account(&server));
    server.expect(
        Expectation::matching(request::method_path("POST", "/token"))
            .respond_with(status_code(500).body("backend error")),
    );

    let output = generate_token(&server, workdir.path(), Some(&adc));
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert_eq!(
        stderr,
        "Error generating access token: [500 Internal Server Error] backend error\n"
    );
}

#[test]
fn pretty_printed_rejection_stays_on_one_line() {
    let workdir = tempfile::tempdir().unwrap();
    let server = Server::run();
    let adc = workdir.path().join("adc.json");
    fs::write(&adc, authorized_user(&server)).unwrap();
    server.expect(
        Expectation::matching(request::method_path("POST", "/token")).respond_with(
            status_code(400).body(
                "{\n  \"error\": \"invalid_grant\",\n  \"error_description\": \"Bad Request\"\n}",
            ),
        ),
    );

    let output = generate_token(&server, workdir.path(), Some(&adc));
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert_eq!(stderr.lines().count(), 1);
    assert_eq!(
        stderr,
        "Error generating access token: [400 Bad Request] invalid_grant: Bad Request\n"
    );
}
