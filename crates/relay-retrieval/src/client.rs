use async_trait::async_trait;
use relay_core::{RelayError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Options for one vector query.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub top_k: usize,
    pub collection: String,
}

/// One hit as returned by the store. The stored document text is also
/// duplicated under the `"text"` metadata key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
    pub text: String,
    pub distance: f64,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// A query reply: the hits plus the queried collection's own metadata.
/// Collection metadata may carry per-collection threshold overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryReply {
    #[serde(default)]
    pub results: Vec<Hit>,
    #[serde(default)]
    pub collection_metadata: serde_json::Map<String, serde_json::Value>,
}

/// A collection as listed by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Trait implemented by each vector-retrieval backend.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Query a collection for the nearest documents to `text`.
    async fn query(&self, text: &str, opts: &QueryOptions) -> Result<QueryReply>;

    /// List the store's collections with their metadata.
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    /// Check if the store is healthy / reachable.
    async fn health_check(&self) -> Result<()>;
}

/// HTTP client for the collection-wrapper retrieval service.
pub struct HttpVectorStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVectorStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn query(&self, text: &str, opts: &QueryOptions) -> Result<QueryReply> {
        debug!(collection = %opts.collection, top_k = opts.top_k, "querying vector store");

        let body = serde_json::json!({
            "query": text,
            "top_k": opts.top_k,
            "collection": opts.collection,
        });

        let resp = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::Retrieval(format!("query request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(RelayError::Retrieval(format!("query HTTP {status}: {text}")));
        }

        resp.json::<QueryReply>()
            .await
            .map_err(|e| RelayError::Retrieval(format!("query parse error: {e}")))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        #[derive(Deserialize)]
        struct Listing {
            #[serde(default)]
            collections: Vec<CollectionInfo>,
        }

        let resp = self
            .client
            .get(format!("{}/collections", self.base_url))
            .send()
            .await
            .map_err(|e| RelayError::Retrieval(format!("collections request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(RelayError::Retrieval(format!("collections HTTP {status}")));
        }

        let listing: Listing = resp
            .json()
            .await
            .map_err(|e| RelayError::Retrieval(format!("collections parse error: {e}")))?;
        Ok(listing.collections)
    }

    async fn health_check(&self) -> Result<()> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| RelayError::Retrieval(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(RelayError::Retrieval(format!(
                "health check HTTP {}",
                resp.status()
            )))
        }
    }
}
