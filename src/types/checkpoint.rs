//! Checkpoint for resumable execution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Current checkpoint record version.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Prefix of the marker appended to `completed_nodes` on every loop restart.
pub const RESTART_MARKER_PREFIX: &str = "--restart-";

/// Builds the restart-separator marker for restart number `n`.
pub fn restart_marker(n: u32) -> String {
  format!("{}{}--", RESTART_MARKER_PREFIX, n)
}

/// Returns true if `entry` is a restart-separator marker rather than a node id.
pub fn is_restart_marker(entry: &str) -> bool {
  entry.starts_with(RESTART_MARKER_PREFIX) && entry.ends_with("--")
}

/// Checkpoint written after every stage completion. Every field is required on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Checkpoint {
  pub version: u32,
  pub pipeline_id: String,
  /// RFC 3339 timestamp of the write.
  pub timestamp: String,
  /// Node whose completion produced this checkpoint.
  pub current_node: String,
  /// Completion log, restart markers included.
  pub completed_nodes: Vec<String>,
  /// Total attempts per node.
  pub node_retries: BTreeMap<String, u32>,
  /// Latest status string per node of the current segment.
  pub node_outcomes: BTreeMap<String, String>,
  pub context_values: BTreeMap<String, String>,
  pub logs: Vec<String>,
  pub restart_count: u32,
}

impl Checkpoint {
  /// Node ids after the last restart marker.
  pub fn current_segment(&self) -> &[String] {
    let start = self
      .completed_nodes
      .iter()
      .rposition(|n| is_restart_marker(n))
      .map(|i| i + 1)
      .unwrap_or(0);
    &self.completed_nodes[start..]
  }
}
