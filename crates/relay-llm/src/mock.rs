//! Mock chat provider for deterministic testing.
//!
//! Returns pre-configured responses without making any HTTP calls.

use async_trait::async_trait;
use relay_core::{Message, RelayError, Result, Role, ToolCall};
use std::sync::{Arc, Mutex};

use crate::provider::*;

/// A mock provider that returns queued responses in order.
///
/// # Example
/// ```
/// use relay_llm::mock::MockProvider;
/// let provider = MockProvider::new().with_response("Hello, world!");
/// ```
pub struct MockProvider {
    responses: Arc<Mutex<Vec<MockResponse>>>,
    /// Track all requests received (for assertions in tests).
    pub requests: Arc<Mutex<Vec<ChatRequest>>>,
}

/// A pre-configured response from the mock provider.
#[derive(Clone)]
pub struct MockResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
    /// If set, the provider will fail with this (status, message) instead.
    pub error: Option<(u16, String)>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            text: String::new(),
            tool_calls: vec![],
            usage: Usage {
                input_tokens: 100,
                output_tokens: 50,
            },
            error: None,
        }
    }
}

impl MockResponse {
    /// Create a text response.
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    /// Create an error response.
    pub fn error(status: u16, msg: &str) -> Self {
        Self {
            error: Some((status, msg.to_string())),
            ..Default::default()
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![])),
            requests: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Queue a simple text response.
    pub fn with_response(self, text: &str) -> Self {
        self.responses.lock().unwrap().push(MockResponse::text(text));
        self
    }

    /// Queue a tool call response.
    pub fn with_tool_call(self, name: &str, args: serde_json::Value) -> Self {
        self.responses.lock().unwrap().push(MockResponse {
            tool_calls: vec![ToolCall {
                id: format!("call_{}", uuid::Uuid::new_v4()),
                tool_name: name.to_string(),
                arguments: args,
            }],
            ..Default::default()
        });
        self
    }

    /// Queue an error response.
    pub fn with_error(self, status: u16, msg: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(MockResponse::error(status, msg));
        self
    }

    /// Queue a fully custom response.
    pub fn with_mock_response(self, resp: MockResponse) -> Self {
        self.responses.lock().unwrap().push(resp);
        self
    }

    /// Get all requests that were made to this provider.
    pub fn recorded_requests(&self) -> Arc<Mutex<Vec<ChatRequest>>> {
        Arc::clone(&self.requests)
    }

    /// Pop the next queued response, or a fixed fallback when the queue is dry.
    fn next_response(&self) -> MockResponse {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            MockResponse {
                text: "(mock: no more queued responses)".to_string(),
                ..Default::default()
            }
        } else {
            responses.remove(0)
        }
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let mock = self.next_response();

        if let Some((status, message)) = mock.error {
            return Err(RelayError::Provider { status, message });
        }

        let has_tool_calls = !mock.tool_calls.is_empty();
        let mut msg = Message::text(Role::Assistant, mock.text);
        msg.tool_calls = mock.tool_calls;

        Ok(ChatResponse {
            message: msg,
            usage: mock.usage,
            has_tool_calls,
        })
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
