//! Mock vector store for deterministic aggregator and pipeline tests.

use async_trait::async_trait;
use relay_core::{RelayError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::client::{CollectionInfo, Hit, QueryOptions, QueryReply, VectorStore};

/// An in-memory store with fixed per-collection replies.
#[derive(Default)]
pub struct MockStore {
    replies: HashMap<String, QueryReply>,
    /// Collections that fail every query.
    failing: Vec<String>,
    /// Every (collection, query) pair received, in order.
    pub queries: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the hits a collection returns, closest distance not required first.
    pub fn with_hits(mut self, collection: &str, hits: Vec<(f64, &str)>) -> Self {
        let reply = QueryReply {
            results: hits
                .into_iter()
                .map(|(distance, text)| Hit {
                    text: text.to_string(),
                    distance,
                    metadata: Default::default(),
                })
                .collect(),
            collection_metadata: Default::default(),
        };
        self.replies.insert(collection.to_string(), reply);
        self
    }

    /// Attach collection metadata (e.g. threshold overrides) to a collection.
    pub fn with_collection_metadata(mut self, collection: &str, metadata: serde_json::Value) -> Self {
        let entry = self.replies.entry(collection.to_string()).or_default();
        if let serde_json::Value::Object(map) = metadata {
            entry.collection_metadata = map;
        }
        self
    }

    /// Make every query against a collection fail.
    pub fn with_failure(mut self, collection: &str) -> Self {
        self.failing.push(collection.to_string());
        self
    }

    /// The (collection, query) log shared with tests.
    pub fn recorded_queries(&self) -> Arc<Mutex<Vec<(String, String)>>> {
        Arc::clone(&self.queries)
    }
}

#[async_trait]
impl VectorStore for MockStore {
    async fn query(&self, text: &str, opts: &QueryOptions) -> Result<QueryReply> {
        self.queries
            .lock()
            .unwrap()
            .push((opts.collection.clone(), text.to_string()));

        if self.failing.contains(&opts.collection) {
            return Err(RelayError::Retrieval(format!(
                "mock failure for collection {}",
                opts.collection
            )));
        }

        let mut reply = self
            .replies
            .get(&opts.collection)
            .cloned()
            .unwrap_or_default();
        reply.results.truncate(opts.top_k);
        Ok(reply)
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        Ok(self
            .replies
            .iter()
            .map(|(name, reply)| CollectionInfo {
                name: name.clone(),
                count: reply.results.len(),
                metadata: reply.collection_metadata.clone(),
            })
            .collect())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
