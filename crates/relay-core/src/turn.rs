use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Role;
use crate::tool::ToolCallRecord;

/// The unit of work for one user message. Created by the caller per request;
/// immutable within a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnContext {
    pub user_message: String,
    /// Recent conversation history, oldest first.
    #[serde(default)]
    pub previous_messages: Vec<HistoryEntry>,
    /// Topic carried over from the previous turn, if any. The caller is
    /// responsible for round-tripping `TopicResult.topic` back in here.
    #[serde(default)]
    pub declared_topic: Option<String>,
    /// Sources the caller explicitly asked to consult, in priority order.
    #[serde(default)]
    pub selected_sources: Vec<String>,
}

/// One prior conversation turn as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

// ── Topic ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    Continuation,
    NewTopic,
}

/// Produced once per turn by the topic continuity tracker. `topic` is
/// returned unnormalized; use [`normalize_topic`] before lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicResult {
    pub topic: String,
    pub status: TopicStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_topic: Option<Vec<String>>,
}

/// Collapse whitespace and lowercase a topic summary for use as a lookup key.
pub fn normalize_topic(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ── Retrieval ──────────────────────────────────────────────────

/// One hit returned by a vector store. Distance is a dissimilarity score
/// (lower = more relevant); scales are per-source, never compared across sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    pub source_id: String,
    pub text: String,
    pub distance: f64,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

/// A source whose best hit fell inside the fallback band: not close enough
/// for an immediate match, close enough to defer to classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCandidates {
    pub source_id: String,
    pub best_distance: f64,
    pub evidence: Vec<RetrievalCandidate>,
}

/// Outcome of the retrieval aggregation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RetrievalOutcome {
    /// A source cleared its immediate-match threshold; no later source was queried.
    Matched {
        source_id: String,
        evidence: Vec<RetrievalCandidate>,
    },
    /// Sources inside the fallback band, in evaluation order.
    Candidates(Vec<SourceCandidates>),
    NoEvidence,
}

impl RetrievalOutcome {
    pub fn evidence_category(&self) -> EvidenceCategory {
        match self {
            RetrievalOutcome::Matched { .. } => EvidenceCategory::Match,
            RetrievalOutcome::Candidates(c) if !c.is_empty() => EvidenceCategory::Partial,
            _ => EvidenceCategory::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceCategory {
    Match,
    Partial,
    None,
}

// ── Intent ─────────────────────────────────────────────────────

/// Sentinel label when classification cannot commit to anything better.
pub const INTENT_OTHER: &str = "other";

/// Result of the intent stage. `label` is a configured symbolic intent, a
/// source identifier (with its evidence re-attached), or [`INTENT_OTHER`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<RetrievalCandidate>,
    /// True when the disambiguation call actually ran (i.e. the turn went
    /// through a reasoning step rather than a direct evidence match).
    #[serde(default)]
    pub reasoned: bool,
}

impl IntentResult {
    pub fn other() -> Self {
        Self {
            label: INTENT_OTHER.to_string(),
            evidence: vec![],
            reasoned: false,
        }
    }
}

// ── Profile ────────────────────────────────────────────────────

/// Flat matching record consumed only by the handler matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Normalized topic key.
    pub topic: String,
    pub intent_label: String,
    pub has_evidence: bool,
    pub evidence_category: EvidenceCategory,
    /// Whether the intent disambiguation step ran for this turn.
    pub reasoned: bool,
}

// ── Turn output ────────────────────────────────────────────────

/// Everything `process_turn` hands back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutput {
    pub content: String,
    pub topic: TopicResult,
    pub matched_handler_id: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub max_iterations_reached: bool,
}
