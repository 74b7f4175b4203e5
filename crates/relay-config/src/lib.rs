//! # relay-config
//!
//! Configuration for the relay service (`relay.toml`): provider connections,
//! retrieval stores and sources, response handlers, and the pipeline knobs.
//! Handlers and thresholds are configuration data — loaded once, hot-reloaded
//! on file change, and handed to each turn as an immutable snapshot.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::*;
