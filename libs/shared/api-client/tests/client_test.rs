use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_api_client::{ApiClient, ApiError, TokenSource};
use shared_utils::test_utils::{MockApiResponses, TestConfig};

struct StaticToken(Mutex<Option<String>>);

impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.lock().unwrap().clone()
    }

    fn clear(&self) {
        *self.0.lock().unwrap() = None;
    }
}

#[tokio::test]
async fn test_bearer_token_is_attached() {
    let mock_server = MockServer::start().await;
    let tokens = Arc::new(StaticToken(Mutex::new(Some("abc123".to_string()))));
    let client = ApiClient::new(&TestConfig::with_api_url(&mock_server.uri()).to_app_config())
        .unwrap()
        .with_token_source(tokens);

    Mock::given(method("GET"))
        .and(path("/api/usuarios/me"))
        .and(header("Authorization", "Bearer abc123"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body: Value = client.get("/api/usuarios/me").await.unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_query_parameters_are_encoded() {
    let mock_server = MockServer::start().await;
    let client = ApiClient::new(&TestConfig::with_api_url(&mock_server.uri()).to_app_config()).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/busqueda/doctores"))
        .and(query_param("ciudad", "San José"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body: Vec<Value> = client
        .get_with_query("/api/busqueda/doctores", &[("ciudad", "San José")])
        .await
        .unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_unauthorized_clears_token() {
    let mock_server = MockServer::start().await;
    let tokens = Arc::new(StaticToken(Mutex::new(Some("stale".to_string()))));
    let client = ApiClient::new(&TestConfig::with_api_url(&mock_server.uri()).to_app_config())
        .unwrap()
        .with_token_source(tokens.clone());

    Mock::given(method("GET"))
        .and(path("/api/citas/proximas"))
        .respond_with(ResponseTemplate::new(401).set_body_json(MockApiResponses::detail_response("Token expirado")))
        .mount(&mock_server)
        .await;

    let result: Result<Value, ApiError> = client.get("/api/citas/proximas").await;

    assert_matches!(result, Err(ApiError::Unauthorized(msg)) if msg == "Token expirado");
    assert!(tokens.token().is_none());
}

#[tokio::test]
async fn test_validation_errors_are_flattened() {
    let mock_server = MockServer::start().await;
    let client = ApiClient::new(&TestConfig::with_api_url(&mock_server.uri()).to_app_config()).unwrap();

    Mock::given(method("POST"))
        .and(path("/api/citas/"))
        .respond_with(ResponseTemplate::new(422).set_body_json(MockApiResponses::validation_error_response()))
        .mount(&mock_server)
        .await;

    let result: Result<Value, ApiError> = client.post("/api/citas/", &json!({})).await;
    let err = result.unwrap_err();

    assert_eq!(
        err.user_message(),
        "motivo: field required, fecha_hora: invalid datetime format"
    );
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let mock_server = MockServer::start().await;
    let mut config = TestConfig::with_api_url(&mock_server.uri());
    config.request_timeout_secs = 1;
    let client = ApiClient::new(&config.to_app_config()).unwrap();

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let result: Result<Value, ApiError> = client.get("/slow").await;
    assert_matches!(result, Err(ApiError::Timeout));
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let client = ApiClient::new(&TestConfig::with_api_url("http://127.0.0.1:9").to_app_config()).unwrap();

    let result: Result<Value, ApiError> = client.get("/api/doctores").await;
    assert_matches!(result, Err(ApiError::Network(_)));
    assert!(!client.test_connection().await);
}

#[tokio::test]
async fn test_connection_probe() {
    let mock_server = MockServer::start().await;
    let client = ApiClient::new(&TestConfig::with_api_url(&mock_server.uri()).to_app_config()).unwrap();

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .mount(&mock_server)
        .await;

    assert!(client.test_connection().await);
}
