use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::provider::{ChatProvider, ChatRequest, ChatResponse};
use relay_core::{RelayError, Result};

/// Maximum retry attempts for transient errors (429, 5xx, transport).
const MAX_RETRIES: u32 = 3;
/// Base delay for exponential backoff (doubles each retry).
const BASE_DELAY_MS: u64 = 500;

/// Static mapping from configured provider id to a shared provider instance.
/// Populated once at startup (or on configuration reload); looked up by key —
/// never by dynamic loading.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ChatProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider under a configured id.
    pub fn insert(&mut self, id: impl Into<String>, provider: Arc<dyn ChatProvider>) {
        let id = id.into();
        info!(provider = %id, kind = provider.name(), "registered chat provider");
        self.providers.insert(id, provider);
    }

    /// Look up a provider by configured id.
    pub fn get(&self, id: &str) -> Result<Arc<dyn ChatProvider>> {
        self.providers
            .get(id)
            .cloned()
            .ok_or_else(|| RelayError::ProviderNotConfigured(id.to_string()))
    }

    pub fn ids(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }

    /// Complete a request against the named provider, retrying with
    /// exponential backoff on transient errors.
    pub async fn complete(&self, provider_id: &str, request: &ChatRequest) -> Result<ChatResponse> {
        let provider = self.get(provider_id)?;
        let mut last_err = None;

        for attempt in 0..=MAX_RETRIES {
            match provider.complete(request).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_transient() && attempt < MAX_RETRIES => {
                    let delay = BASE_DELAY_MS * 2u64.pow(attempt);
                    warn!(
                        provider = provider_id,
                        attempt = attempt + 1,
                        max = MAX_RETRIES,
                        delay_ms = delay,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        // Only reachable when every attempt failed with a transient error.
        Err(last_err.unwrap_or_else(|| RelayError::Provider {
            status: 0,
            message: "retries exhausted".into(),
        }))
    }
}
