use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use relay_core::{RetrievalCandidate, RetrievalOutcome, SourceCandidates};

use crate::client::{QueryOptions, VectorStore};
use crate::source::Source;

/// The named vector-store connections shared by all turns.
#[derive(Clone, Default)]
pub struct SourceSet {
    stores: HashMap<String, Arc<dyn VectorStore>>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self {
            stores: HashMap::new(),
        }
    }

    pub fn insert_store(&mut self, id: impl Into<String>, store: Arc<dyn VectorStore>) {
        self.stores.insert(id.into(), store);
    }

    pub fn store(&self, id: &str) -> Option<&Arc<dyn VectorStore>> {
        self.stores.get(id)
    }

    /// Consult sources in order and aggregate evidence under the two-tier
    /// threshold policy.
    ///
    /// Explicitly `selected` sources are checked first, in the order given;
    /// then every source with a standing detection policy, skipping any
    /// already checked. The first source whose best distance clears its
    /// immediate-match threshold wins outright — later sources are not
    /// queried. Sources inside the fallback band accumulate as candidates
    /// for the intent classifier. A failing source contributes nothing and
    /// never aborts aggregation.
    pub async fn collect(
        &self,
        query: &str,
        sources: &[Source],
        selected: &[String],
    ) -> RetrievalOutcome {
        let mut checked: HashSet<&str> = HashSet::new();
        let mut ordered: Vec<&Source> = Vec::new();

        for id in selected {
            match sources.iter().find(|s| &s.id == id) {
                Some(s) => {
                    if checked.insert(s.id.as_str()) {
                        ordered.push(s);
                    }
                }
                None => warn!(source = %id, "selected source is not configured — skipping"),
            }
        }
        for s in sources {
            if s.detect && checked.insert(s.id.as_str()) {
                ordered.push(s);
            }
        }

        let mut candidates: Vec<SourceCandidates> = Vec::new();

        for source in ordered {
            let Some(store) = self.stores.get(&source.store) else {
                warn!(source = %source.id, store = %source.store, "source references missing store — skipping");
                continue;
            };

            let opts = QueryOptions {
                top_k: source.top_k,
                collection: source.collection.clone(),
            };
            let reply = match store.query(query, &opts).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(source = %source.id, error = %e, "source retrieval failed — continuing");
                    continue;
                }
            };
            if reply.results.is_empty() {
                debug!(source = %source.id, "source returned no hits");
                continue;
            }

            let (lower, upper) = resolve_thresholds(source, &reply.collection_metadata);

            let mut evidence: Vec<RetrievalCandidate> = reply
                .results
                .into_iter()
                .map(|hit| RetrievalCandidate {
                    source_id: source.id.clone(),
                    text: hit.text,
                    distance: hit.distance,
                    metadata: hit.metadata,
                })
                .collect();
            evidence.sort_by(|a, b| {
                a.distance
                    .partial_cmp(&b.distance)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let best = evidence[0].distance;

            if best < lower {
                info!(source = %source.id, distance = best, "immediate evidence match");
                return RetrievalOutcome::Matched {
                    source_id: source.id.clone(),
                    evidence,
                };
            }
            if best < upper {
                debug!(source = %source.id, distance = best, "borderline candidate — deferring to classification");
                candidates.push(SourceCandidates {
                    source_id: source.id.clone(),
                    best_distance: best,
                    evidence,
                });
            } else {
                debug!(source = %source.id, distance = best, "best hit beyond fallback threshold — discarded");
            }
        }

        if candidates.is_empty() {
            RetrievalOutcome::NoEvidence
        } else {
            RetrievalOutcome::Candidates(candidates)
        }
    }
}

/// Per-query threshold resolution: collection metadata wins over the source's
/// configured values.
fn resolve_thresholds(
    source: &Source,
    metadata: &serde_json::Map<String, serde_json::Value>,
) -> (f64, f64) {
    let lower = metadata
        .get("lower_threshold")
        .and_then(|v| v.as_f64())
        .unwrap_or(source.lower_threshold);
    let upper = metadata
        .get("upper_threshold")
        .and_then(|v| v.as_f64())
        .unwrap_or(source.upper_threshold);
    (lower, upper)
}
