use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_config::{ConfigLoader, LoggingConfig};
use relay_core::{RelayError, Result};
use relay_server::AppState;

#[derive(Parser)]
#[command(
    name = "relay",
    version,
    about = "Retrieval-grounded chat turn orchestration service"
)]
pub struct Cli {
    /// Path to relay.toml (default: $RELAY_CONFIG or ~/.relay/relay.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server (the default)
    Serve,
    /// Load and validate the configuration, then exit
    CheckConfig,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command.unwrap_or(Command::Serve) {
            Command::Serve => serve(self.config.as_deref()).await,
            Command::CheckConfig => check_config(self.config.as_deref()),
        }
    }
}

fn init_tracing(cfg: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if cfg.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn serve(config_path: Option<&Path>) -> Result<()> {
    let loader = Arc::new(ConfigLoader::load(config_path)?);
    let cfg = loader.snapshot();
    init_tracing(&cfg.logging);
    info!(version = env!("CARGO_PKG_VERSION"), "starting relay");

    let providers = Arc::new(crate::bootstrap::build_providers(&cfg)?);
    let stores = Arc::new(crate::bootstrap::build_stores(&cfg));
    let tools = Arc::new(crate::bootstrap::build_tools(&cfg));

    // Keep the watcher alive for the lifetime of the server.
    let _watcher = loader.watch()?;

    relay_server::run(Arc::new(AppState {
        loader,
        providers,
        stores,
        tools,
    }))
    .await
}

fn check_config(config_path: Option<&Path>) -> Result<()> {
    let loader = ConfigLoader::load(config_path)?;
    let cfg = loader.snapshot();
    match cfg.validate() {
        Ok(warnings) => {
            for w in &warnings {
                println!("warning: {w}");
            }
            println!(
                "configuration OK: {} provider(s), {} source(s), {} handler(s)",
                cfg.llm.providers.len(),
                cfg.retrieval.sources.len(),
                cfg.handlers.len()
            );
            Ok(())
        }
        Err(e) => Err(RelayError::Config(e)),
    }
}
