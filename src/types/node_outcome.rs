//! Result of executing a single pipeline node.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{AttrValue, OutcomeStatus};

/// Result of executing a single pipeline node. Immutable once returned to the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutcome {
  pub status: OutcomeStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub failure_reason: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default)]
  pub context_updates: HashMap<String, AttrValue>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub preferred_label: Option<String>,
  #[serde(default)]
  pub suggested_next_ids: Vec<String>,
  /// Continue traversal at this node instead of consulting the edge selector.
  /// Set by fan-out stages that already ran their branches.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub jump_to: Option<String>,
  /// Nodes executed on behalf of this stage, recorded as completed after it.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub executed_nodes: Vec<(String, OutcomeStatus)>,
}

impl NodeOutcome {
  fn with_status(status: OutcomeStatus) -> Self {
    Self {
      status,
      failure_reason: None,
      notes: None,
      context_updates: HashMap::new(),
      preferred_label: None,
      suggested_next_ids: vec![],
      jump_to: None,
      executed_nodes: vec![],
    }
  }

  pub fn success(notes: impl Into<String>) -> Self {
    Self {
      notes: Some(notes.into()),
      ..Self::with_status(OutcomeStatus::Success)
    }
  }

  pub fn fail(reason: impl Into<String>) -> Self {
    Self {
      failure_reason: Some(reason.into()),
      ..Self::with_status(OutcomeStatus::Fail)
    }
  }

  pub fn retry(reason: impl Into<String>) -> Self {
    Self {
      failure_reason: Some(reason.into()),
      ..Self::with_status(OutcomeStatus::Retry)
    }
  }

  /// Bare outcome carrying only a status, as restored from a checkpoint.
  pub fn from_status(status: OutcomeStatus) -> Self {
    Self::with_status(status)
  }

  pub fn with_update(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
    self.context_updates.insert(key.into(), value.into());
    self
  }

  pub fn with_preferred_label(mut self, label: impl Into<String>) -> Self {
    self.preferred_label = Some(label.into());
    self
  }

  pub fn with_suggested_next(mut self, ids: Vec<String>) -> Self {
    self.suggested_next_ids = ids;
    self
  }

  pub fn is_success(&self) -> bool {
    self.status == OutcomeStatus::Success
  }
}
