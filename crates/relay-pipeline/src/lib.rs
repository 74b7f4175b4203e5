//! # relay-pipeline
//!
//! The turn orchestration pipeline. One turn runs the stages in strict order:
//! topic continuity → evidence retrieval → intent classification → profile →
//! handler matching → the bounded tool-calling loop. Every stage before the
//! loop always produces a usable result; only the loop (and configuration
//! errors) can surface a failure to the caller.

pub mod handler;
pub mod intent;
pub mod profile;
pub mod resolve;
pub mod tool_loop;
pub mod topic;
pub mod turn;

pub use handler::{match_handler, render_prompt};
pub use resolve::{Stage, StageModel, resolve_stage_model};
pub use tool_loop::{LoopOutcome, LoopParams, run_tool_loop};
pub use topic::detect_topic;
pub use turn::process_turn;
