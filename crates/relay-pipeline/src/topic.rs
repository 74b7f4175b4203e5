use std::time::Duration;
use tracing::{debug, warn};

use relay_config::PipelineConfig;
use relay_core::{HistoryEntry, Message, Role, TopicResult, TopicStatus};
use relay_llm::{ChatRequest, ProviderRegistry};

use crate::resolve::StageModel;

const TOPIC_SYSTEM: &str =
    "You are a topic classifier. Reply with only the requested JSON object, nothing else.";

/// Track topic continuity across turns. Always produces a result: a
/// malformed classifier reply, a missing stage model, or a provider failure
/// all fall back to treating the truncated raw message as a new topic.
pub async fn detect_topic(
    providers: &ProviderRegistry,
    stage: Option<&StageModel>,
    message: &str,
    history: &[HistoryEntry],
    declared_topic: Option<&str>,
    pipeline: &PipelineConfig,
    llm_timeout: Duration,
) -> TopicResult {
    let Some(stage) = stage else {
        warn!("no classifier model configured for topic detection — using raw message");
        return fallback(message, declared_topic, pipeline.topic_max_chars);
    };

    let prompt = build_prompt(message, history, declared_topic, pipeline.history_window);
    let mut request = ChatRequest::new(&stage.model, vec![Message::text(Role::User, prompt)]);
    request.system = Some(TOPIC_SYSTEM.to_string());
    request.temperature = stage.temperature;
    request.max_tokens = stage.max_tokens;
    request.timeout = llm_timeout;

    let reply = match providers.complete(&stage.provider, &request).await {
        Ok(resp) => resp.message.text_content(),
        Err(e) => {
            warn!(error = %e, "topic classification call failed — using raw message");
            return fallback(message, declared_topic, pipeline.topic_max_chars);
        }
    };

    match parse_reply(&reply) {
        Some((status, summary)) => {
            debug!(?status, topic = %summary, "topic detected");
            let parent_topic = match (status, declared_topic) {
                (TopicStatus::NewTopic, Some(prev)) if !prev.is_empty() => {
                    Some(vec![prev.to_string()])
                }
                _ => None,
            };
            TopicResult {
                topic: summary,
                status,
                parent_topic,
            }
        }
        None => {
            warn!(reply = %reply, "malformed topic classifier reply — using raw message");
            fallback(message, declared_topic, pipeline.topic_max_chars)
        }
    }
}

fn build_prompt(
    message: &str,
    history: &[HistoryEntry],
    declared_topic: Option<&str>,
    window: usize,
) -> String {
    let topic_line = match declared_topic {
        Some(t) if !t.is_empty() => t,
        _ => "none",
    };

    let mut transcript = String::new();
    let start = history.len().saturating_sub(window);
    for entry in &history[start..] {
        let role = match entry.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        };
        transcript.push_str(&format!("{role}: {}\n", entry.text));
    }
    if transcript.is_empty() {
        transcript.push_str("(no prior messages)\n");
    }

    format!(
        "Current topic: {topic_line}\n\n\
         Recent conversation:\n{transcript}\n\
         New message: {message}\n\n\
         Decide whether the new message continues the current topic or starts a new one, \
         and summarize the topic in a few words. Reply with a JSON object with exactly \
         these fields:\n\
         {{\"topic_status\": \"continuation\" or \"new_topic\", \"topic_summary\": \"<short topic label>\"}}"
    )
}

/// Lenient parse of the strict output contract: strip code fences, take the
/// first `{...}` object, and require both fields with valid values.
fn parse_reply(reply: &str) -> Option<(TopicStatus, String)> {
    let object = extract_json_object(reply)?;
    let value: serde_json::Value = serde_json::from_str(&object).ok()?;

    let status = match value.get("topic_status")?.as_str()? {
        "continuation" => TopicStatus::Continuation,
        "new_topic" => TopicStatus::NewTopic,
        _ => return None,
    };
    let summary = value.get("topic_summary")?.as_str()?.trim().to_string();
    if summary.is_empty() {
        return None;
    }
    Some((status, summary))
}

fn extract_json_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(text[start..=end].to_string())
}

fn fallback(message: &str, declared_topic: Option<&str>, max_chars: usize) -> TopicResult {
    let topic: String = message.chars().take(max_chars).collect();
    let parent_topic = declared_topic
        .filter(|t| !t.is_empty())
        .map(|t| vec![t.to_string()]);
    TopicResult {
        topic,
        status: TopicStatus::NewTopic,
        parent_topic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let (status, summary) =
            parse_reply(r#"{"topic_status": "continuation", "topic_summary": "billing dispute"}"#)
                .unwrap();
        assert_eq!(status, TopicStatus::Continuation);
        assert_eq!(summary, "billing dispute");
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = "```json\n{\"topic_status\": \"new_topic\", \"topic_summary\": \"refunds\"}\n```";
        let (status, summary) = parse_reply(reply).unwrap();
        assert_eq!(status, TopicStatus::NewTopic);
        assert_eq!(summary, "refunds");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_reply("not json").is_none());
        assert!(parse_reply(r#"{"topic_status": "maybe", "topic_summary": "x"}"#).is_none());
        assert!(parse_reply(r#"{"topic_summary": "missing status"}"#).is_none());
        assert!(parse_reply(r#"{"topic_status": "new_topic", "topic_summary": ""}"#).is_none());
    }

    #[test]
    fn test_fallback_truncates_message() {
        let long = "x".repeat(500);
        let result = fallback(&long, None, 120);
        assert_eq!(result.topic.chars().count(), 120);
        assert_eq!(result.status, TopicStatus::NewTopic);
        assert!(result.parent_topic.is_none());
    }

    #[test]
    fn test_prompt_embeds_declared_topic_and_window() {
        let history: Vec<HistoryEntry> = (0..10)
            .map(|i| HistoryEntry {
                role: Role::User,
                text: format!("msg{i}"),
            })
            .collect();
        let prompt = build_prompt("new question", &history, Some("billing"), 3);
        assert!(prompt.contains("Current topic: billing"));
        assert!(prompt.contains("msg9"));
        assert!(prompt.contains("msg7"));
        // Outside the window
        assert!(!prompt.contains("msg6"));
    }

    #[test]
    fn test_prompt_uses_none_sentinel() {
        let prompt = build_prompt("hi", &[], None, 6);
        assert!(prompt.contains("Current topic: none"));
        assert!(prompt.contains("(no prior messages)"));
    }
}
