use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Description of a tool the answering model may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique name, e.g. "http_fetch", "current_time".
    pub name: String,
    /// Human-readable description for the LLM.
    pub description: String,
    /// JSON Schema of the parameters object.
    pub parameters: Value,
}

/// A request from the LLM to call a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub tool_name: String,
    pub arguments: Value,
}

/// The result of executing a tool call. Always produced: tool failures are
/// carried in `is_error`, never raised past the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub content: String,
    pub is_error: bool,
}

/// Audit record for one executed tool invocation within a turn. Accumulated
/// across loop iterations and returned with the final answer; not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub params: Value,
    /// 1-based loop iteration the call was requested in.
    pub iteration: u32,
    pub execution_time_ms: u64,
    pub success: bool,
    /// Tool output on success, error description on failure.
    pub result: String,
}

/// Trait implemented by each concrete tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// The tool's name/description/schema as presented to the model.
    fn spec(&self) -> ToolSpec;

    /// Execute with the given parameters and return the text output.
    async fn execute(&self, params: &Value) -> crate::Result<String>;
}
