use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use relay_core::{ToolCall, ToolHandler, ToolResult, ToolSpec};

/// Name → handler map, resolved by exact name. Built once at startup and
/// shared read-only across turns.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let spec = handler.spec();
        debug!(tool = %spec.name, "registered tool");
        self.tools.insert(spec.name, handler);
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Specs of every registered tool, sorted by name for stable prompts.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|t| t.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Execute one tool call under a timeout. Always produces a result:
    /// unknown tools, handler failures, and timeouts all come back to the
    /// model as `is_error` results, never raised.
    pub async fn invoke(&self, call: &ToolCall, timeout: Duration) -> ToolResult {
        let Some(handler) = self.tools.get(&call.tool_name) else {
            warn!(tool = %call.tool_name, "model requested unknown tool");
            return ToolResult {
                tool_call_id: call.id.clone(),
                content: format!("unknown tool: {}", call.tool_name),
                is_error: true,
            };
        };

        debug!(tool = %call.tool_name, "executing tool");
        match tokio::time::timeout(timeout, handler.execute(&call.arguments)).await {
            Ok(Ok(output)) => ToolResult {
                tool_call_id: call.id.clone(),
                content: output,
                is_error: false,
            },
            Ok(Err(e)) => {
                warn!(tool = %call.tool_name, error = %e, "tool execution failed");
                ToolResult {
                    tool_call_id: call.id.clone(),
                    content: e.to_string(),
                    is_error: true,
                }
            }
            Err(_) => {
                warn!(tool = %call.tool_name, timeout_secs = timeout.as_secs(), "tool execution timed out");
                ToolResult {
                    tool_call_id: call.id.clone(),
                    content: "timeout".to_string(),
                    is_error: true,
                }
            }
        }
    }
}
