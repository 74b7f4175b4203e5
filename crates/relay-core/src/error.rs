use thiserror::Error;

/// Unified error type for the entire relay service.
#[derive(Error, Debug)]
pub enum RelayError {
    // ── Provider errors ────────────────────────────────────────
    /// Transport or vendor failure from a chat-completion provider.
    /// `status` is the HTTP status code, or 0 when the request never
    /// reached the provider (connect error, timeout).
    #[error("provider error (HTTP {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("provider not configured: {0}")]
    ProviderNotConfigured(String),

    // ── Retrieval errors ───────────────────────────────────────
    #[error("retrieval error: {0}")]
    Retrieval(String),

    #[error("unknown source: {0}")]
    SourceNotFound(String),

    // ── Tool errors ────────────────────────────────────────────
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool execution failed: {tool}: {reason}")]
    ToolExecution { tool: String, reason: String },

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RelayError {
    /// True when retrying the same call may succeed (rate limit, server-side
    /// hiccup, or the request never reached the provider at all).
    pub fn is_transient(&self) -> bool {
        match self {
            RelayError::Provider { status, .. } => {
                matches!(*status, 0 | 429 | 500 | 502 | 503 | 529)
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
