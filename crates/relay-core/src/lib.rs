//! # relay-core
//!
//! Core types, traits, and primitives for the relay turn orchestrator.
//! This crate defines the shared vocabulary used by every other crate in the workspace.

pub mod error;
pub mod message;
pub mod tool;
pub mod turn;

pub use error::{RelayError, Result};
pub use message::{Content, Message, Role};
pub use tool::{ToolCall, ToolCallRecord, ToolHandler, ToolResult, ToolSpec};
pub use turn::*;
