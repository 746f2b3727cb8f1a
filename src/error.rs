//! Crate error type.
//!
//! Expected pipeline failures (missing handler, cancellation, dead ends) are not
//! errors: they come back as a failed [crate::PipelineResult]. `AttractorError`
//! covers malformed inputs and I/O.

use thiserror::Error;

/// Errors raised by graph loading, checkpoint persistence and handlers.
#[derive(Debug, Error)]
pub enum AttractorError {
  #[error("invalid graph: {0}")]
  InvalidGraph(String),

  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("DOT parse error: {0}")]
  Parse(String),

  #[error("checkpoint I/O error at {path}: {source}")]
  CheckpointIo {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("checkpoint decode error: {0}")]
  CheckpointDecode(#[from] serde_json::Error),

  #[error("checkpoint encode error: {0}")]
  CheckpointEncode(#[source] serde_json::Error),

  #[error("unsupported checkpoint version {found} (expected {expected})")]
  CheckpointVersion { found: u32, expected: u32 },

  #[error("graph source error: {0}")]
  GraphSource(String),

  #[error("handler error: {0}")]
  Handler(String),

  #[error("backend error: {0}")]
  Backend(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, AttractorError>;
