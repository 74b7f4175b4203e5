use async_trait::async_trait;
use relay_core::{Content, Message, RelayError, Result, Role, ToolCall};
use reqwest::Client;
use tracing::debug;

use crate::provider::*;

/// Ollama native chat provider (`/api/chat`).
pub struct OllamaProvider {
    client: Client,
    base_url: String,
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OllamaProvider {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "http://127.0.0.1:11434".into(),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn build_request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut messages = Vec::new();

        if let Some(ref system) = request.system {
            messages.push(serde_json::json!({
                "role": "system",
                "content": system,
            }));
        }

        for msg in &request.messages {
            match msg.role {
                Role::System | Role::User => {
                    let role = if msg.role == Role::System { "system" } else { "user" };
                    messages.push(serde_json::json!({
                        "role": role,
                        "content": msg.text_content(),
                    }));
                }
                Role::Assistant => {
                    let mut m = serde_json::json!({
                        "role": "assistant",
                        "content": msg.text_content(),
                    });
                    if !msg.tool_calls.is_empty() {
                        let calls: Vec<serde_json::Value> = msg
                            .tool_calls
                            .iter()
                            .map(|tc| {
                                serde_json::json!({
                                    "function": {
                                        "name": tc.tool_name,
                                        "arguments": tc.arguments,
                                    },
                                })
                            })
                            .collect();
                        m["tool_calls"] = serde_json::json!(calls);
                    }
                    messages.push(m);
                }
                Role::Tool => {
                    for block in &msg.content {
                        if let Content::ToolResult { content, .. } = block {
                            messages.push(serde_json::json!({
                                "role": "tool",
                                "content": content,
                            }));
                        }
                    }
                }
            }
        }

        let mut body = serde_json::json!({
            "model": &request.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            },
        });

        if !request.tools.is_empty() {
            let tools: Vec<serde_json::Value> = request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        },
                    })
                })
                .collect();
            body["tools"] = serde_json::json!(tools);
        }

        body
    }
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let body = self.build_request_body(request);
        debug!(model = %request.model, "sending ollama chat request");

        let resp = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::Provider {
                status: 0,
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(RelayError::Provider {
                status,
                message: text,
            });
        }

        let data: serde_json::Value = resp.json().await.map_err(|e| RelayError::Provider {
            status: 0,
            message: format!("response parse error: {e}"),
        })?;

        let message = &data["message"];
        let content_text = message["content"].as_str().unwrap_or_default().to_string();

        let tool_calls: Vec<ToolCall> = message["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|c| {
                        let name = c["function"]["name"].as_str()?;
                        Some(ToolCall {
                            id: format!("call_{}", uuid::Uuid::new_v4()),
                            tool_name: name.to_string(),
                            arguments: c["function"]["arguments"].clone(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let usage = Usage {
            input_tokens: data["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
            output_tokens: data["eval_count"].as_u64().unwrap_or(0) as u32,
        };

        let has_tool_calls = !tool_calls.is_empty();
        let mut msg = Message::text(Role::Assistant, content_text);
        msg.tool_calls = tool_calls;

        Ok(ChatResponse {
            message: msg,
            usage,
            has_tool_calls,
        })
    }

    async fn health_check(&self) -> Result<()> {
        let resp = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| RelayError::Provider {
                status: 0,
                message: e.to_string(),
            })?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(RelayError::Provider {
                status: resp.status().as_u16(),
                message: "health check failed".into(),
            })
        }
    }
}
