use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::schema::RelayConfig;

/// Loads and optionally hot-reloads the relay configuration.
pub struct ConfigLoader {
    config: Arc<RwLock<RelayConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > RELAY_CONFIG env > ~/.relay/relay.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("RELAY_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".relay")
            .join("relay.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> relay_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            toml::from_str::<RelayConfig>(&raw).map_err(|e| {
                relay_core::RelayError::Config(format!(
                    "failed to parse {}: {}",
                    config_path.display(),
                    e
                ))
            })?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            RelayConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        // Validate config — log warnings, fail on errors
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(relay_core::RelayError::Config(e));
            }
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Clone an immutable snapshot of the current config. Each turn works
    /// from its own snapshot so a concurrent hot-reload can never produce a
    /// partially-updated view mid-pipeline.
    pub fn snapshot(&self) -> RelayConfig {
        self.config.read().clone()
    }

    /// Shared reference for subscription.
    pub fn shared(&self) -> Arc<RwLock<RelayConfig>> {
        Arc::clone(&self.config)
    }

    /// Path being watched.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (RELAY_SERVER_LISTEN, RELAY_LOG_LEVEL, etc.)
    fn apply_env_overrides(mut config: RelayConfig) -> RelayConfig {
        if let Ok(v) = std::env::var("RELAY_SERVER_LISTEN") {
            config.server.listen = v;
        }
        if let Ok(v) = std::env::var("RELAY_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("RELAY_RETRIEVAL_URL") {
            config
                .retrieval
                .stores
                .entry("default".to_string())
                .or_default()
                .url = v;
        }
        // API keys: env var fills in when the config file doesn't set one.
        // Config file takes priority, env is the fallback.
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            for provider in config.llm.providers.values_mut() {
                if provider.kind == "openai" && provider.api_key.is_none() {
                    provider.api_key = Some(v.clone());
                }
            }
        }
        config
    }

    /// Reload the config from disk.
    pub fn reload(&self) -> relay_core::Result<()> {
        if !self.config_path.exists() {
            return Err(relay_core::RelayError::Config(format!(
                "config file not found: {}",
                self.config_path.display()
            )));
        }
        let raw = std::fs::read_to_string(&self.config_path)?;
        let new_config = toml::from_str::<RelayConfig>(&raw).map_err(|e| {
            relay_core::RelayError::Config(format!(
                "failed to parse {}: {}",
                self.config_path.display(),
                e
            ))
        })?;
        let new_config = Self::apply_env_overrides(new_config);
        *self.config.write() = new_config;
        info!("configuration reloaded");
        Ok(())
    }

    /// Start a background file watcher that swaps in the new config when the
    /// file changes. Returns the watcher handle (must be kept alive).
    pub fn watch(&self) -> relay_core::Result<notify::RecommendedWatcher> {
        let config = Arc::clone(&self.config);
        let config_path = self.config_path.clone();

        info!(?config_path, "starting config file watcher");

        let path_for_event = config_path.clone();
        let mut watcher =
            notify::recommended_watcher(move |res: Result<NotifyEvent, notify::Error>| {
                match res {
                    Ok(event) => {
                        match event.kind {
                            EventKind::Modify(_) | EventKind::Create(_) => {
                                let is_our_file = event
                                    .paths
                                    .iter()
                                    .any(|p| p.file_name() == path_for_event.file_name());
                                if !is_our_file {
                                    return;
                                }

                                info!("config file changed, reloading");
                                match std::fs::read_to_string(&path_for_event) {
                                    Ok(raw) => match toml::from_str::<RelayConfig>(&raw) {
                                        Ok(new_config) => {
                                            let new_config =
                                                ConfigLoader::apply_env_overrides(new_config);
                                            match new_config.validate() {
                                                Ok(warnings) => {
                                                    for w in &warnings {
                                                        warn!("{}", w);
                                                    }
                                                    *config.write() = new_config;
                                                    info!("configuration hot-reloaded");
                                                }
                                                Err(e) => {
                                                    warn!(error = %e, "config file invalid, keeping current config");
                                                }
                                            }
                                        }
                                        Err(e) => {
                                            warn!(error = %e, "config file has errors, keeping current config");
                                        }
                                    },
                                    Err(e) => {
                                        warn!(error = %e, "failed to read config file during hot-reload");
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "file watcher error");
                    }
                }
            })
            .map_err(|e| {
                relay_core::RelayError::Config(format!("failed to create file watcher: {e}"))
            })?;

        // Watch the parent directory (some editors create temp files + rename)
        let watch_path = self.config_path.parent().unwrap_or(Path::new("."));
        watcher
            .watch(watch_path, RecursiveMode::NonRecursive)
            .map_err(|e| {
                relay_core::RelayError::Config(format!("failed to watch config directory: {e}"))
            })?;

        Ok(watcher)
    }
}
