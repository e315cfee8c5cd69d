//! Error types for programmer-error-class failures.
//!
//! Streamed game data (snapshots, deltas) never produces an `Err` here —
//! see the crate-level docs and spec section on error handling. This type
//! exists only for construction-time misconfiguration and demo-binary
//! fixture loading.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid adaptive delay config: min_delay_ms ({min_delay_ms}) > max_delay_ms ({max_delay_ms})")]
    InvalidAdaptiveConfig { min_delay_ms: f32, max_delay_ms: f32 },
}
