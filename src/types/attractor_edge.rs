//! An edge in the Attractor pipeline graph.

use std::collections::HashMap;

use super::AttrValue;

/// A directed edge with typed attributes.
///
/// Recognized attributes: `condition`, `label`, `weight`, `fidelity`, `loop_restart`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttractorEdge {
  pub from_node: String,
  pub to_node: String,
  pub attributes: HashMap<String, AttrValue>,
}

impl AttractorEdge {
  pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
    Self {
      from_node: from.into(),
      to_node: to.into(),
      attributes: HashMap::new(),
    }
  }

  pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
    self.attributes.insert(key.into(), value.into());
    self
  }

  fn text(&self, key: &str) -> Option<String> {
    self
      .attributes
      .get(key)
      .map(|v| v.to_string())
      .filter(|s| !s.trim().is_empty())
  }

  /// Non-empty condition expression.
  pub fn condition(&self) -> Option<String> {
    self.text("condition")
  }

  pub fn label(&self) -> Option<String> {
    self.text("label")
  }

  pub fn weight(&self) -> i64 {
    self
      .attributes
      .get("weight")
      .and_then(AttrValue::as_int)
      .unwrap_or(0)
  }

  pub fn fidelity(&self) -> Option<String> {
    self.text("fidelity")
  }

  pub fn loop_restart(&self) -> bool {
    self
      .attributes
      .get("loop_restart")
      .and_then(AttrValue::as_bool)
      .unwrap_or(false)
  }
}
