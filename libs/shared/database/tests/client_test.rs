use assert_matches::assert_matches;
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::{BackendClient, BackendError};

fn client_for(server: &MockServer, token: &str) -> BackendClient {
    BackendClient::new(&AppConfig {
        api_base_url: format!("{}/", server.uri()),
        api_token: token.to_string(),
        ..AppConfig::default()
    })
}

#[tokio::test]
async fn test_request_sends_bearer_token_and_decodes_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/operatories"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "OP1"}])))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, "secret-token");
    let body: Vec<Value> = client.request(Method::GET, "/operatories", None).await.unwrap();

    assert_eq!(body, vec![json!({"id": "OP1"})]);
    assert!(!client.get_base_url().ends_with('/'));
}

#[tokio::test]
async fn test_error_status_carries_backend_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"message": "Slot already booked"})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, "");
    let result: Result<Value, _> = client
        .request(Method::POST, "/appointments", Some(json!({"operatory": "OP1"})))
        .await;

    assert_matches!(
        result,
        Err(BackendError::Http { status: 409, message: Some(ref msg) }) if msg == "Slot already booked"
    );
}

#[tokio::test]
async fn test_request_empty_accepts_no_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/appointments/7"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, "");
    assert!(client.request_empty(Method::DELETE, "/appointments/7", None).await.is_ok());
}

#[tokio::test]
async fn test_undecodable_body_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/scheduler-config"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, "");
    let result: Result<Value, _> = client.request(Method::GET, "/scheduler-config", None).await;

    assert_matches!(result, Err(BackendError::Decode(_)));
}
