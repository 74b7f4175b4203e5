use async_trait::async_trait;
use relay_core::{Message, Result, ToolSpec};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A request to a chat-completion provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// The model to use (provider-specific name).
    pub model: String,
    /// Conversation so far, including tool-call / tool-result turns.
    pub messages: Vec<Message>,
    /// Tools the model may request. Empty = tool calling disabled.
    pub tools: Vec<ToolSpec>,
    /// System prompt (separate from messages for providers that support it).
    pub system: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Wall-clock bound for this one call.
    pub timeout: Duration,
}

impl ChatRequest {
    /// A minimal request around a message list; stages override what they need.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: vec![],
            system: None,
            max_tokens: 1024,
            temperature: 0.7,
            timeout: Duration::from_secs(120),
        }
    }
}

/// A complete response from a chat-completion provider.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub message: Message,
    pub usage: Usage,
    /// Whether the model wants to continue (has tool calls).
    pub has_tool_calls: bool,
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    pub fn merge(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Trait implemented by each chat-completion provider.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider kind name, e.g. "openai", "ollama", "mock".
    fn name(&self) -> &str;

    /// Send a request and wait for the complete response.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Check if this provider is healthy / reachable.
    async fn health_check(&self) -> Result<()>;
}
