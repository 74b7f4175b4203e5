use std::time::{Duration, Instant};
use tracing::{debug, warn};

use relay_core::{Message, RelayError, Result, ToolCallRecord};
use relay_llm::{ChatRequest, ProviderRegistry, Usage};
use relay_tools::ToolRegistry;

/// Inputs for one tool-loop invocation, assembled from the matched handler
/// and the turn context.
pub struct LoopParams<'a> {
    pub provider_id: &'a str,
    pub model: &'a str,
    pub system: Option<String>,
    /// Prior history plus the rendered user prompt.
    pub messages: Vec<Message>,
    pub tools_enabled: bool,
    /// Upper bound on model calls.
    pub max_iterations: u32,
    pub temperature: f32,
    pub max_tokens: u32,
    pub llm_timeout: Duration,
    pub tool_timeout: Duration,
}

/// What the loop hands back: the final text, the full audit trail of tool
/// executions in order, and whether the iteration bound cut the loop short.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub content: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub max_iterations_reached: bool,
    pub usage: Usage,
}

/// The bounded generate → execute → feed-back loop.
///
/// Each iteration is one model call. Tool requests within an iteration
/// execute concurrently, but the loop waits for all of them before the next
/// model call. Tool failures (unknown name, timeout, handler error) are fed
/// back to the model as error results — the model decides how to proceed.
/// Only a provider failure aborts the loop, classified for the user by
/// status code.
pub async fn run_tool_loop(
    providers: &ProviderRegistry,
    tools: &ToolRegistry,
    params: LoopParams<'_>,
) -> Result<LoopOutcome> {
    let tool_specs = if params.tools_enabled {
        tools.specs()
    } else {
        vec![]
    };

    let mut messages = params.messages;
    let mut records: Vec<ToolCallRecord> = Vec::new();
    let mut total_usage = Usage::default();
    let mut iteration: u32 = 0;

    loop {
        iteration += 1;

        let request = ChatRequest {
            model: params.model.to_string(),
            messages: messages.clone(),
            tools: tool_specs.clone(),
            system: params.system.clone(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            timeout: params.llm_timeout,
        };

        let response = providers
            .complete(params.provider_id, &request)
            .await
            .map_err(|e| classify_provider_error(e, params.model))?;
        total_usage.merge(&response.usage);

        let content = response.message.text_content();
        let tool_calls = response.message.tool_calls.clone();
        messages.push(response.message);

        if tool_calls.is_empty() {
            debug!(iterations = iteration, "model produced a plain answer");
            return Ok(LoopOutcome {
                content,
                tool_calls: records,
                max_iterations_reached: false,
                usage: total_usage,
            });
        }

        // Execute this iteration's calls concurrently; every result must
        // land before the next model call.
        let tool_timeout = params.tool_timeout;
        let executions = tool_calls.iter().map(|call| async move {
            let started = Instant::now();
            let result = tools.invoke(call, tool_timeout).await;
            (call, result, started.elapsed())
        });
        for (call, result, elapsed) in futures::future::join_all(executions).await {
            records.push(ToolCallRecord {
                tool_name: call.tool_name.clone(),
                params: call.arguments.clone(),
                iteration,
                execution_time_ms: elapsed.as_millis() as u64,
                success: !result.is_error,
                result: result.content.clone(),
            });
            messages.push(Message::tool_result(
                result.tool_call_id.as_str(),
                result.content.as_str(),
                result.is_error,
            ));
        }

        if iteration >= params.max_iterations {
            // The model still wants tools but the bound is spent; return the
            // last call's content with the flag set — never silently dropped.
            warn!(
                iterations = iteration,
                "tool loop reached max iterations with an outstanding tool request"
            );
            return Ok(LoopOutcome {
                content,
                tool_calls: records,
                max_iterations_reached: true,
                usage: total_usage,
            });
        }
    }
}

/// Map a provider failure to a short, user-actionable message. 400-class
/// responses typically mean the model rejected the tool-call schema; 404
/// means the model id is wrong; anything else passes through unchanged.
fn classify_provider_error(err: RelayError, model: &str) -> RelayError {
    match err {
        RelayError::Provider { status: 404, .. } => RelayError::ModelNotFound(model.to_string()),
        RelayError::Provider { status, .. } if (400..500).contains(&status) && status != 429 => {
            RelayError::Provider {
                status,
                message: format!("model '{model}' likely does not support tool calling"),
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_404_as_model_not_found() {
        let err = RelayError::Provider {
            status: 404,
            message: "nope".into(),
        };
        assert!(matches!(
            classify_provider_error(err, "m"),
            RelayError::ModelNotFound(_)
        ));
    }

    #[test]
    fn test_classify_400_as_tool_calling_unsupported() {
        let err = RelayError::Provider {
            status: 400,
            message: "invalid request".into(),
        };
        match classify_provider_error(err, "m") {
            RelayError::Provider { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("tool calling"));
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_classify_passes_server_errors_through() {
        let err = RelayError::Provider {
            status: 503,
            message: "overloaded".into(),
        };
        match classify_provider_error(err, "m") {
            RelayError::Provider { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("unexpected: {other}"),
        }
    }
}
