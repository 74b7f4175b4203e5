//! # relay-server
//!
//! HTTP API for the relay turn orchestrator:
//!
//! - `POST /api/v1/chat` — run one turn through the pipeline
//! - `GET /api/v1/sources` — configured and discovered evidence sources
//! - `GET /health` — liveness probe
//!
//! The HTTP layer owns nothing: it snapshots the config per request, maps
//! the request body onto a `TurnContext`, and translates pipeline errors to
//! status codes. Topic round-tripping is the client's job — the response
//! carries the detected topic and the client sends it back as `topic`.

use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use relay_config::ConfigLoader;
use relay_core::{HistoryEntry, RelayError, ToolCallRecord, TopicStatus, TurnContext};
use relay_llm::ProviderRegistry;
use relay_pipeline::process_turn;
use relay_retrieval::SourceSet;
use relay_tools::ToolRegistry;

/// Shared server state: the config loader plus the long-lived capability
/// instances. Capabilities are constructed once at startup; the config is
/// snapshotted per request.
pub struct AppState {
    pub loader: Arc<ConfigLoader>,
    pub providers: Arc<ProviderRegistry>,
    pub stores: Arc<SourceSet>,
    pub tools: Arc<ToolRegistry>,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Chat request body.
#[derive(Deserialize)]
struct ChatRequestBody {
    message: String,
    #[serde(default)]
    history: Vec<HistoryEntry>,
    /// The topic returned by the previous turn, if the client kept one.
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    sources: Vec<String>,
}

/// Chat response body.
#[derive(Serialize)]
struct ChatResponseBody {
    content: String,
    topic: String,
    topic_status: TopicStatus,
    matched_handler: String,
    tool_calls: Vec<ToolCallRecord>,
    max_iterations_reached: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct SourceInfo {
    id: String,
    description: String,
    collection: String,
    store: String,
    lower_threshold: f64,
    upper_threshold: f64,
    detect: bool,
}

/// Build the Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = state.loader.snapshot().server.cors;

    let api_routes = Router::new()
        .route("/api/v1/chat", post(chat_handler))
        .route("/api/v1/sources", get(sources_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let router = Router::new()
        .route("/health", get(health_handler))
        .merge(api_routes)
        .with_state(state);

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Bind and serve until the process is stopped.
pub async fn run(state: Arc<AppState>) -> relay_core::Result<()> {
    let listen = state.loader.snapshot().server.listen;
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!(%listen, "relay server listening");
    axum::serve(listener, router)
        .await
        .map_err(|e| RelayError::Config(format!("server error: {e}")))?;
    Ok(())
}

/// Bearer-token auth when `server.api_key` is configured.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.loader.snapshot().server.api_key else {
        return Ok(next.run(request).await);
    };

    let authorized = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected);

    if authorized {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Json<ChatResponseBody>, (StatusCode, Json<ErrorResponse>)> {
    let cfg = state.loader.snapshot();
    let ctx = TurnContext {
        user_message: body.message,
        previous_messages: body.history,
        declared_topic: body.topic,
        selected_sources: body.sources,
    };

    match process_turn(&ctx, &cfg, &state.providers, &state.stores, &state.tools).await {
        Ok(output) => Ok(Json(ChatResponseBody {
            content: output.content,
            topic: output.topic.topic,
            topic_status: output.topic.status,
            matched_handler: output.matched_handler_id,
            tool_calls: output.tool_calls,
            max_iterations_reached: output.max_iterations_reached,
        })),
        Err(e) => Err(error_response(e)),
    }
}

async fn sources_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let cfg = state.loader.snapshot();
    let configured: Vec<SourceInfo> = relay_retrieval::sources_from_config(&cfg.retrieval)
        .into_iter()
        .map(|s| SourceInfo {
            id: s.id,
            description: s.description,
            collection: s.collection,
            store: s.store,
            lower_threshold: s.lower_threshold,
            upper_threshold: s.upper_threshold,
            detect: s.detect,
        })
        .collect();

    // Best-effort discovery of collections the stores expose beyond the
    // configured sources.
    let mut discovered = Vec::new();
    for store_id in cfg.retrieval.stores.keys() {
        let Some(store) = state.stores.store(store_id) else {
            continue;
        };
        match store.list_collections().await {
            Ok(collections) => {
                for c in collections {
                    if !configured.iter().any(|s| s.collection == c.name) {
                        discovered.push(serde_json::json!({
                            "store": store_id,
                            "collection": c.name,
                            "count": c.count,
                            "metadata": c.metadata,
                        }));
                    }
                }
            }
            Err(e) => warn!(store = %store_id, error = %e, "collection discovery failed"),
        }
    }

    Json(serde_json::json!({
        "sources": configured,
        "discovered": discovered,
    }))
}

/// Map pipeline errors to HTTP statuses: provider transport problems are
/// upstream failures (502), configuration problems are ours (500).
fn error_response(e: RelayError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        RelayError::Provider { .. }
        | RelayError::ModelNotFound(_)
        | RelayError::ProviderNotConfigured(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(error = %e, "turn failed");
    (status, Json(ErrorResponse { error: e.to_string() }))
}
