//! Construct the long-lived capability instances from the loaded config.

use std::sync::Arc;

use relay_config::RelayConfig;
use relay_core::{RelayError, Result};
use relay_llm::ProviderRegistry;
use relay_llm::ollama::OllamaProvider;
use relay_llm::openai::OpenAiProvider;
use relay_llm::provider::ChatProvider;
use relay_retrieval::{HttpVectorStore, SourceSet};
use relay_tools::ToolRegistry;
use relay_tools::builtin::register_builtins;

pub fn build_providers(cfg: &RelayConfig) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    for (id, pc) in &cfg.llm.providers {
        let provider: Arc<dyn ChatProvider> = match pc.kind.as_str() {
            "openai" => {
                let mut p = OpenAiProvider::new(pc.api_key.clone());
                if let Some(ref url) = pc.base_url {
                    p = p.with_base_url(url.clone());
                }
                Arc::new(p)
            }
            "ollama" => {
                let mut p = OllamaProvider::new();
                if let Some(ref url) = pc.base_url {
                    p = p.with_base_url(url.clone());
                }
                Arc::new(p)
            }
            other => {
                return Err(RelayError::Config(format!(
                    "provider '{id}': unknown kind '{other}' (expected \"openai\" or \"ollama\")"
                )));
            }
        };
        registry.insert(id.clone(), provider);
    }
    Ok(registry)
}

pub fn build_stores(cfg: &RelayConfig) -> SourceSet {
    let mut set = SourceSet::new();
    for (id, sc) in &cfg.retrieval.stores {
        set.insert_store(id.clone(), Arc::new(HttpVectorStore::new(sc.url.clone())));
    }
    set
}

pub fn build_tools(cfg: &RelayConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry, &cfg.tools.enabled);
    registry
}
