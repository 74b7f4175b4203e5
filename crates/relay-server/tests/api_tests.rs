//! HTTP API tests — exercise the endpoints with a mock provider and store.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use relay_config::ConfigLoader;
use relay_llm::ProviderRegistry;
use relay_llm::mock::MockProvider;
use relay_retrieval::SourceSet;
use relay_retrieval::mock::MockStore;
use relay_server::{AppState, build_router};
use relay_tools::ToolRegistry;

const BASE_CONFIG: &str = r#"
[llm.providers.main]
kind = "openai"

[[handlers]]
id = "fallback"
provider = "main"
model = "answer-model"
prompt = "{{message}}"
"#;

/// Build a test router over a temp config file and a mock provider with the
/// given queued responses.
fn setup(config_toml: &str, responses: Vec<&str>) -> (axum::Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    std::fs::write(&path, config_toml).unwrap();
    let loader = ConfigLoader::load(Some(&path)).unwrap();

    let mut mock = MockProvider::new();
    for r in responses {
        mock = mock.with_response(r);
    }
    let mut providers = ProviderRegistry::new();
    providers.insert("main", Arc::new(mock));

    let mut stores = SourceSet::new();
    stores.insert_store("default", Arc::new(MockStore::new()));

    let state = Arc::new(AppState {
        loader: Arc::new(loader),
        providers: Arc::new(providers),
        stores: Arc::new(stores),
        tools: Arc::new(ToolRegistry::new()),
    });
    (build_router(state), dir)
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn chat_request(body: serde_json::Value) -> Request<Body> {
    Request::post("/api/v1/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _dir) = setup(BASE_CONFIG, vec![]);
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_chat_happy_path() {
    // Queue: topic classification, then the answer (no sources and no
    // intents configured, so no classification call is made).
    let (app, _dir) = setup(
        BASE_CONFIG,
        vec![
            r#"{"topic_status": "new_topic", "topic_summary": "greetings"}"#,
            "Hello back!",
        ],
    );

    let resp = app
        .oneshot(chat_request(serde_json::json!({"message": "hi there"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(json["content"], "Hello back!");
    assert_eq!(json["topic"], "greetings");
    assert_eq!(json["topic_status"], "new_topic");
    assert_eq!(json["matched_handler"], "fallback");
    assert_eq!(json["max_iterations_reached"], false);
    assert!(json["tool_calls"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_round_trips_declared_topic() {
    let (app, _dir) = setup(
        BASE_CONFIG,
        vec![
            r#"{"topic_status": "continuation", "topic_summary": "billing"}"#,
            "Still about billing.",
        ],
    );

    let resp = app
        .oneshot(chat_request(serde_json::json!({
            "message": "and the second invoice?",
            "topic": "billing",
            "history": [
                {"role": "user", "text": "first invoice?"},
                {"role": "assistant", "text": "due monday"}
            ]
        })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["topic_status"], "continuation");
}

#[tokio::test]
async fn test_chat_config_error_is_500() {
    // No handlers at all: the matcher has nowhere to fall back to.
    let config = r#"
[llm.providers.main]
kind = "openai"
"#;
    let (app, _dir) = setup(config, vec![]);

    let resp = app
        .oneshot(chat_request(serde_json::json!({"message": "hi"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(resp).await;
    assert!(json["error"].as_str().unwrap().contains("handler"));
}

#[tokio::test]
async fn test_api_key_required_when_configured() {
    let config = r#"
[llm.providers.main]
kind = "openai"

[server]
api_key = "secret-token"

[[handlers]]
id = "fallback"
provider = "main"
model = "answer-model"
"#;
    let (app, _dir) = setup(
        config,
        vec![
            r#"{"topic_status": "new_topic", "topic_summary": "t"}"#,
            "ok",
        ],
    );

    // Without the token
    let resp = app
        .clone()
        .oneshot(chat_request(serde_json::json!({"message": "hi"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // With the token
    let req = Request::post("/api/v1/chat")
        .header("content-type", "application/json")
        .header("authorization", "Bearer secret-token")
        .body(Body::from(
            serde_json::json!({"message": "hi"}).to_string(),
        ))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_not_behind_auth() {
    let config = r#"
[llm.providers.main]
kind = "openai"

[server]
api_key = "secret-token"

[[handlers]]
id = "fallback"
provider = "main"
model = "m"
"#;
    let (app, _dir) = setup(config, vec![]);
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_sources_endpoint_lists_configured() {
    let config = r#"
[llm.providers.main]
kind = "openai"

[retrieval.stores.default]
url = "http://unused.invalid"

[[retrieval.sources]]
id = "billing"
description = "Billing docs"

[[handlers]]
id = "fallback"
provider = "main"
model = "m"
"#;
    let (app, _dir) = setup(config, vec![]);
    let req = Request::get("/api/v1/sources").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    let sources = json["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["id"], "billing");
}
