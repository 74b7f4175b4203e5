use std::time::Duration;
use tracing::{debug, warn};

use relay_config::IntentConfig;
use relay_core::{
    INTENT_OTHER, IntentResult, Message, RetrievalCandidate, RetrievalOutcome, Role,
};
use relay_llm::{ChatRequest, ProviderRegistry};
use relay_retrieval::Source;

use crate::resolve::StageModel;

const INTENT_SYSTEM: &str =
    "You are an intent classifier. Reply with exactly one label from the list, nothing else.";

/// Determine the turn's intent label. A high-confidence retrieval match is
/// decisive without a classification round-trip; otherwise one
/// low-creativity call disambiguates between borderline sources, configured
/// intents, and "other". Never fails; anything unusable degrades to "other".
pub async fn classify(
    providers: &ProviderRegistry,
    stage: Option<&StageModel>,
    topic: &str,
    outcome: &RetrievalOutcome,
    sources: &[Source],
    intents: &[IntentConfig],
    llm_timeout: Duration,
) -> IntentResult {
    // Self-organizing routing: a matched source is the intent, no model call.
    if let RetrievalOutcome::Matched {
        source_id,
        evidence,
    } = outcome
    {
        debug!(source = %source_id, "evidence match is decisive — skipping classification");
        return IntentResult {
            label: source_id.clone(),
            evidence: evidence.clone(),
            reasoned: false,
        };
    }

    let candidates = match outcome {
        RetrievalOutcome::Candidates(c) => c.as_slice(),
        _ => &[],
    };

    // Enumerate the options: candidate sources, configured intents, catch-all.
    let mut options: Vec<(String, String)> = Vec::new();
    for candidate in candidates {
        let description = sources
            .iter()
            .find(|s| s.id == candidate.source_id)
            .map(|s| s.description.clone())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("documents retrieved from '{}'", candidate.source_id));
        options.push((candidate.source_id.clone(), description));
    }
    for intent in intents {
        options.push((intent.label.clone(), intent.description.clone()));
    }

    if options.is_empty() {
        return IntentResult::other();
    }

    let Some(stage) = stage else {
        warn!("no classifier model configured for intent classification — degrading to other");
        return IntentResult::other();
    };

    let mut lines = String::new();
    for (label, description) in &options {
        lines.push_str(&format!("- {label}: {description}\n"));
    }
    lines.push_str(&format!("- {INTENT_OTHER}: none of the above\n"));

    let prompt = format!(
        "The user is asking about: {topic}\n\n\
         Pick the option that best describes what the user wants:\n{lines}\n\
         Reply with exactly one label from the list."
    );

    let mut request = ChatRequest::new(&stage.model, vec![Message::text(Role::User, prompt)]);
    request.system = Some(INTENT_SYSTEM.to_string());
    request.temperature = stage.temperature;
    request.max_tokens = stage.max_tokens;
    request.timeout = llm_timeout;

    let reply = match providers.complete(&stage.provider, &request).await {
        Ok(resp) => resp.message.text_content(),
        Err(e) => {
            warn!(error = %e, "intent classification call failed — degrading to other");
            return IntentResult {
                reasoned: true,
                ..IntentResult::other()
            };
        }
    };

    let label = normalize_label(&reply);

    // Candidate source label: re-attach the evidence so downstream
    // generation still sees the retrieved context.
    if candidates
        .iter()
        .any(|c| c.source_id.eq_ignore_ascii_case(&label))
    {
        let mut evidence: Vec<RetrievalCandidate> = candidates
            .iter()
            .filter(|c| c.source_id.eq_ignore_ascii_case(&label))
            .flat_map(|c| c.evidence.iter().cloned())
            .collect();
        evidence.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let source_id = candidates
            .iter()
            .find(|c| c.source_id.eq_ignore_ascii_case(&label))
            .map(|c| c.source_id.clone())
            .unwrap_or(label);
        debug!(source = %source_id, "classifier selected candidate source");
        return IntentResult {
            label: source_id,
            evidence,
            reasoned: true,
        };
    }

    if let Some(intent) = intents
        .iter()
        .find(|i| i.label.eq_ignore_ascii_case(&label))
    {
        debug!(intent = %intent.label, "classifier selected configured intent");
        return IntentResult {
            label: intent.label.clone(),
            evidence: vec![],
            reasoned: true,
        };
    }

    if !label.eq_ignore_ascii_case(INTENT_OTHER) {
        warn!(label = %label, "classifier reply matches no known label — degrading to other");
    }
    IntentResult {
        reasoned: true,
        ..IntentResult::other()
    }
}

/// Reduce a classifier reply to a comparable label: first line, trimmed of
/// whitespace, quotes, backticks, and trailing punctuation.
fn normalize_label(reply: &str) -> String {
    reply
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
        .trim_end_matches(['.', ':'])
        .trim()
        .to_string()
}
