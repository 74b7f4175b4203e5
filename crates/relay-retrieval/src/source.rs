use relay_config::{RetrievalConfig, SourceConfig};

/// A named evidence source with its thresholds fully resolved from config.
/// Collection metadata returned at query time can still override the
/// thresholds; metadata is authoritative when present.
#[derive(Debug, Clone)]
pub struct Source {
    pub id: String,
    /// Shown to the intent classifier when this source is a borderline candidate.
    pub description: String,
    pub collection: String,
    /// Which configured store serves this source.
    pub store: String,
    /// Immediate-match threshold: distance below this routes directly.
    pub lower_threshold: f64,
    /// Fallback threshold: distance below this defers to classification.
    pub upper_threshold: f64,
    pub top_k: usize,
    /// Consult this source even when the caller didn't explicitly select it.
    pub detect: bool,
}

impl Source {
    pub fn from_config(cfg: &SourceConfig, defaults: &RetrievalConfig) -> Self {
        Self {
            id: cfg.id.clone(),
            description: cfg.description.clone(),
            collection: cfg.collection_name().to_string(),
            store: cfg.store.clone(),
            lower_threshold: cfg.lower_threshold.unwrap_or(defaults.lower_threshold),
            upper_threshold: cfg.upper_threshold.unwrap_or(defaults.upper_threshold),
            top_k: cfg.top_k.unwrap_or(defaults.top_k),
            detect: cfg.detect,
        }
    }
}

/// Resolve every configured source against the retrieval defaults, keeping
/// configuration order.
pub fn sources_from_config(cfg: &RetrievalConfig) -> Vec<Source> {
    cfg.sources
        .iter()
        .map(|s| Source::from_config(s, cfg))
        .collect()
}
