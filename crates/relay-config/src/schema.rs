use relay_core::EvidenceCategory;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration — maps to `relay.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub pipeline: PipelineConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub handlers: Vec<HandlerConfig>,
    pub intents: Vec<IntentConfig>,
    pub tools: ToolsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Which built-in tools are exposed to tool-enabled handlers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Tool names to register. Empty = every built-in.
    pub enabled: Vec<String>,
}

// ── Pipeline ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How many recent history entries the topic prompt embeds.
    pub history_window: usize,
    /// Truncation length for the raw-message topic fallback.
    pub topic_max_chars: usize,
    /// Process-wide default for handlers that don't set their own bound.
    pub max_tool_iterations: u32,
    /// Per-tool execution timeout.
    pub tool_timeout_secs: u64,
    /// Per-model-call timeout.
    pub llm_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            history_window: 6,
            topic_max_chars: 120,
            max_tool_iterations: 8,
            tool_timeout_secs: 30,
            llm_timeout_secs: 120,
        }
    }
}

// ── LLM providers & stages ─────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Named provider connections, keyed by the id handlers reference.
    pub providers: HashMap<String, ProviderConfig>,
    /// Explicit model for the topic stage. Absent: the intent stage's
    /// config is reused; absent that, the first default handler's model.
    pub topic: Option<StageConfig>,
    /// Explicit model for the intent stage.
    pub intent: Option<StageConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider kind: "openai" (OpenAI-compatible) or "ollama".
    pub kind: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: "openai".into(),
            base_url: None,
            api_key: None,
        }
    }
}

/// Model settings for a classification stage (topic / intent).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            model: String::new(),
            temperature: 0.0,
            max_tokens: 256,
        }
    }
}

// ── Retrieval ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Named vector-store connections, keyed by the id sources reference.
    pub stores: HashMap<String, StoreConfig>,
    /// Default hits per query.
    pub top_k: usize,
    /// Default immediate-match threshold (distance below this routes directly).
    pub lower_threshold: f64,
    /// Default fallback threshold (distance below this defers to classification).
    pub upper_threshold: f64,
    pub sources: Vec<SourceConfig>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            stores: HashMap::new(),
            top_k: 3,
            lower_threshold: 0.3,
            upper_threshold: 0.6,
            sources: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5006".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub id: String,
    /// Shown to the intent classifier when this source is a borderline candidate.
    pub description: String,
    /// Collection name in the vector store. Defaults to `id` when empty.
    pub collection: String,
    /// Which configured store serves this source.
    pub store: String,
    /// Per-source overrides; collection metadata still wins over these.
    pub lower_threshold: Option<f64>,
    pub upper_threshold: Option<f64>,
    pub top_k: Option<usize>,
    /// Standing detection policy: consult this source even when the caller
    /// didn't explicitly select it.
    pub detect: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            description: String::new(),
            collection: String::new(),
            store: "default".into(),
            lower_threshold: None,
            upper_threshold: None,
            top_k: None,
            detect: true,
        }
    }
}

impl SourceConfig {
    pub fn collection_name(&self) -> &str {
        if self.collection.is_empty() {
            &self.id
        } else {
            &self.collection
        }
    }
}

// ── Handlers & intents ─────────────────────────────────────────

/// A configured response policy. Evaluated in list order; the first handler
/// whose rule matches the turn profile wins. A handler without a rule is the
/// unconditional default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    pub id: String,
    #[serde(rename = "match")]
    pub match_rule: Option<MatchRule>,
    pub provider: String,
    pub model: String,
    pub system_prompt: Option<String>,
    /// User-prompt template. Placeholders: {{message}}, {{topic}}, {{evidence}}.
    pub prompt: String,
    pub tools_enabled: bool,
    /// Overrides `pipeline.max_tool_iterations` for this handler.
    pub max_tool_iterations: Option<u32>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            match_rule: None,
            provider: String::new(),
            model: String::new(),
            system_prompt: None,
            prompt: "{{message}}".into(),
            tools_enabled: false,
            max_tool_iterations: None,
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

impl HandlerConfig {
    pub fn is_default(&self) -> bool {
        self.match_rule.is_none()
    }
}

/// Conjunctive predicate over the turn profile. Absent fields are "don't care".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRule {
    /// Exact source/intent-label identity.
    pub source: Option<String>,
    /// Substring match on the intent label (source/collection names).
    pub source_contains: Option<String>,
    /// Exact intent label equality.
    pub intent: Option<String>,
    pub evidence: Option<EvidenceRule>,
    /// Require (or forbid) that the intent disambiguation step ran.
    pub requires_reasoning: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceRule {
    Match,
    Partial,
    None,
    Any,
}

impl EvidenceRule {
    pub fn accepts(&self, category: EvidenceCategory) -> bool {
        match self {
            EvidenceRule::Any => true,
            EvidenceRule::Match => category == EvidenceCategory::Match,
            EvidenceRule::Partial => category == EvidenceCategory::Partial,
            EvidenceRule::None => category == EvidenceCategory::None,
        }
    }
}

/// A statically configured symbolic intent, offered to the classifier
/// alongside borderline retrieval candidates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    pub label: String,
    pub description: String,
}

// ── Server & logging ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    /// Bearer token required on API routes when set.
    pub api_key: Option<String>,
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:5007".into(),
            api_key: None,
            cors: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

impl RelayConfig {
    /// Validate the configuration. Returns warnings for hazards that keep a
    /// well-defined runtime behavior; errors for configurations that cannot
    /// work at all.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();

        for (i, h) in self.handlers.iter().enumerate() {
            if h.id.is_empty() {
                return Err(format!("handlers[{i}]: id must not be empty"));
            }
            if h.model.is_empty() {
                return Err(format!("handler '{}': model must not be empty", h.id));
            }
            if !h.provider.is_empty() && !self.llm.providers.contains_key(&h.provider) {
                return Err(format!(
                    "handler '{}' references unknown provider '{}'",
                    h.id, h.provider
                ));
            }
        }

        // Multiple unconditional handlers: only the first is reachable.
        let defaults: Vec<&str> = self
            .handlers
            .iter()
            .filter(|h| h.is_default())
            .map(|h| h.id.as_str())
            .collect();
        if defaults.len() > 1 {
            warnings.push(format!(
                "multiple handlers without a match rule; only '{}' is reachable (unreachable: {})",
                defaults[0],
                defaults[1..].join(", ")
            ));
        }
        if defaults.is_empty() && !self.handlers.is_empty() {
            warnings.push(
                "no default handler configured; turns matching no rule will fail".to_string(),
            );
        }

        for s in &self.retrieval.sources {
            if s.id.is_empty() {
                return Err("retrieval source with empty id".to_string());
            }
            if !self.retrieval.stores.contains_key(&s.store) {
                return Err(format!(
                    "source '{}' references unknown store '{}'",
                    s.id, s.store
                ));
            }
            let lower = s.lower_threshold.unwrap_or(self.retrieval.lower_threshold);
            let upper = s.upper_threshold.unwrap_or(self.retrieval.upper_threshold);
            if lower > upper {
                return Err(format!(
                    "source '{}': lower_threshold {} exceeds upper_threshold {}",
                    s.id, lower, upper
                ));
            }
        }

        if let Some(stage) = &self.llm.topic {
            if !self.llm.providers.contains_key(&stage.provider) {
                return Err(format!(
                    "llm.topic references unknown provider '{}'",
                    stage.provider
                ));
            }
        }
        if let Some(stage) = &self.llm.intent {
            if !self.llm.providers.contains_key(&stage.provider) {
                return Err(format!(
                    "llm.intent references unknown provider '{}'",
                    stage.provider
                ));
            }
        }

        Ok(warnings)
    }
}
