use async_trait::async_trait;
use relay_core::{Content, Message, RelayError, Result, Role, ToolCall};
use reqwest::Client;
use tracing::debug;

use crate::provider::*;

/// OpenAI-compatible chat-completions provider. Also fronts Ollama's `/v1`
/// endpoint and most self-hosted gateways.
pub struct OpenAiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.openai.com/v1".into(),
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
                Role::System => {
                    messages.push(serde_json::json!({
                        "role": "system",
                        "content": msg.text_content(),
                    }));
                }
                Role::User => {
                    messages.push(serde_json::json!({
                        "role": "user",
                        "content": msg.text_content(),
                    }));
                }
                Role::Assistant => {
                    if msg.tool_calls.is_empty() {
                        messages.push(serde_json::json!({
                            "role": "assistant",
                            "content": msg.text_content(),
                        }));
                    } else {
                        let tool_calls: Vec<serde_json::Value> = msg
                            .tool_calls
                            .iter()
                            .map(|tc| {
                                serde_json::json!({
                                    "id": tc.id,
                                    "type": "function",
                                    "function": {
                                        "name": tc.tool_name,
                                        "arguments": tc.arguments.to_string(),
                                    },
                                })
                            })
                            .collect();
                        let text = msg.text_content();
                        let content = if text.is_empty() {
                            serde_json::Value::Null
                        } else {
                            serde_json::Value::String(text)
                        };
                        messages.push(serde_json::json!({
                            "role": "assistant",
                            "content": content,
                            "tool_calls": tool_calls,
                        }));
                    }
                }
                Role::Tool => {
                    // One "tool" message per result block
                    for block in &msg.content {
                        if let Content::ToolResult {
                            tool_call_id,
                            content,
                            ..
                        } = block
                        {
                            messages.push(serde_json::json!({
                                "role": "tool",
                                "tool_call_id": tool_call_id,
                                "content": content,
                            }));
                        }
                    }
                }
            }
        }

        let mut body = serde_json::json!({
            "model": &request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": messages,
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
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let body = self.build_request_body(request);
        debug!(model = %request.model, "sending chat-completions request");

        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .timeout(request.timeout)
            .header("content-type", "application/json");
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let resp = req.json(&body).send().await.map_err(|e| {
            RelayError::Provider {
                status: 0,
                message: e.to_string(),
            }
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

        let message = &data["choices"][0]["message"];
        let content_text = message["content"].as_str().unwrap_or_default().to_string();

        let tool_calls: Vec<ToolCall> = message["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|c| {
                        let name = c["function"]["name"].as_str()?;
                        // Arguments arrive JSON-encoded inside a string
                        let arguments = c["function"]["arguments"]
                            .as_str()
                            .and_then(|s| serde_json::from_str(s).ok())
                            .unwrap_or(serde_json::Value::Null);
                        Some(ToolCall {
                            id: c["id"]
                                .as_str()
                                .map(String::from)
                                .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4())),
                            tool_name: name.to_string(),
                            arguments,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let usage = Usage {
            input_tokens: data["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: data["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
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
        let mut req = self.client.get(format!("{}/models", self.base_url));
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }
        let resp = req.send().await.map_err(|e| RelayError::Provider {
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
