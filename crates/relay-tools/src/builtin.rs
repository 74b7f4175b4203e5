//! Built-in tools available to handlers with tool calling enabled.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use relay_core::{RelayError, Result, ToolHandler, ToolSpec};

use crate::registry::ToolRegistry;

/// Cap on fetched body size fed back to the model.
const FETCH_MAX_BYTES: usize = 64 * 1024;

/// Fetch a URL and return the response body as text.
pub struct HttpFetchTool {
    client: reqwest::Client,
}

impl Default for HttpFetchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetchTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ToolHandler for HttpFetchTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "http_fetch".into(),
            description: "Fetch a URL over HTTP GET and return the response body as text.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "The URL to fetch" }
                },
                "required": ["url"]
            }),
        }
    }

    async fn execute(&self, params: &Value) -> Result<String> {
        let url = params["url"].as_str().ok_or_else(|| RelayError::ToolExecution {
            tool: "http_fetch".into(),
            reason: "missing required parameter: url".into(),
        })?;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RelayError::ToolExecution {
                tool: "http_fetch".into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| RelayError::ToolExecution {
            tool: "http_fetch".into(),
            reason: e.to_string(),
        })?;

        let mut out = format!("HTTP {status}\n");
        if body.len() > FETCH_MAX_BYTES {
            let truncated: String = body.chars().take(FETCH_MAX_BYTES).collect();
            out.push_str(&truncated);
            out.push_str("\n[... body truncated ...]");
        } else {
            out.push_str(&body);
        }
        Ok(out)
    }
}

/// Report the current UTC date and time.
pub struct CurrentTimeTool;

#[async_trait]
impl ToolHandler for CurrentTimeTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "current_time".into(),
            description: "Get the current date and time in UTC (RFC 3339).".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    async fn execute(&self, _params: &Value) -> Result<String> {
        Ok(chrono::Utc::now().to_rfc3339())
    }
}

/// Register every built-in tool whose name is in `enabled` (empty = all).
pub fn register_builtins(registry: &mut ToolRegistry, enabled: &[String]) {
    let all: Vec<Arc<dyn ToolHandler>> =
        vec![Arc::new(HttpFetchTool::new()), Arc::new(CurrentTimeTool)];
    for tool in all {
        if enabled.is_empty() || enabled.iter().any(|n| *n == tool.spec().name) {
            registry.register(tool);
        }
    }
}
