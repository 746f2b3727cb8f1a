//! A node (stage) in an Attractor pipeline graph.

use std::collections::HashMap;

use super::AttrValue;

/// Returns true if the shape indicates a start node (Mdiamond).
pub(crate) fn shape_is_start(shape: &str) -> bool {
  shape.eq_ignore_ascii_case("Mdiamond")
}

/// Returns true if the shape indicates an exit node (Msquare).
pub(crate) fn shape_is_exit(shape: &str) -> bool {
  shape.eq_ignore_ascii_case("Msquare")
}

/// Returns true if the id indicates a start node.
pub(crate) fn id_is_start(id: &str) -> bool {
  id.eq_ignore_ascii_case("start")
}

/// Returns true if the id indicates an exit node.
pub(crate) fn id_is_exit(id: &str) -> bool {
  id.eq_ignore_ascii_case("exit")
}

/// Maps DOT shape names to handler type strings.
pub(crate) fn handler_type_for_shape(shape: &str) -> &'static str {
  match shape {
    "Mdiamond" => "start",
    "Msquare" => "exit",
    "hexagon" => "wait.human",
    "diamond" => "conditional",
    "component" => "parallel",
    "tripleoctagon" => "parallel.fan_in",
    "parallelogram" => "tool",
    "house" => "stack.manager_loop",
    _ => "codergen",
  }
}

/// A node in the pipeline graph: an id plus typed attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct AttractorNode {
  pub id: String,
  pub attributes: HashMap<String, AttrValue>,
}

impl AttractorNode {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      attributes: HashMap::new(),
    }
  }

  /// Builder-style attribute setter.
  pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
    self.attributes.insert(key.into(), value.into());
    self
  }

  pub fn attr(&self, key: &str) -> Option<&AttrValue> {
    self.attributes.get(key)
  }

  /// Attribute rendered as a string; `None` when absent.
  pub fn attr_string(&self, key: &str) -> Option<String> {
    self.attributes.get(key).map(|v| v.to_string())
  }

  /// Non-empty string attribute.
  fn non_empty(&self, key: &str) -> Option<String> {
    self.attr_string(key).filter(|s| !s.trim().is_empty())
  }

  pub fn shape(&self) -> String {
    self.non_empty("shape").unwrap_or_else(|| "box".to_string())
  }

  /// Declared handler type: the `type` attribute, else derived from `shape`.
  pub fn handler_type(&self) -> String {
    self
      .non_empty("type")
      .unwrap_or_else(|| handler_type_for_shape(&self.shape()).to_string())
  }

  /// Display label, defaulting to the id.
  pub fn label(&self) -> String {
    self.non_empty("label").unwrap_or_else(|| self.id.clone())
  }

  pub fn prompt(&self) -> Option<String> {
    self.non_empty("prompt")
  }

  /// Node-level `max_retries`, if declared.
  pub fn max_retries(&self) -> Option<u32> {
    self
      .attr("max_retries")
      .and_then(AttrValue::as_int)
      .map(|n| u32::try_from(n.max(0)).unwrap_or(u32::MAX))
  }

  pub fn retry_target(&self) -> Option<String> {
    self.non_empty("retry_target")
  }

  pub fn goal_gate(&self) -> bool {
    self
      .attr("goal_gate")
      .and_then(AttrValue::as_bool)
      .unwrap_or(false)
  }

  pub fn is_start(&self) -> bool {
    shape_is_start(&self.shape()) || id_is_start(&self.id)
  }

  pub fn is_exit(&self) -> bool {
    shape_is_exit(&self.shape()) || id_is_exit(&self.id)
  }

  pub fn is_terminal(&self) -> bool {
    self.is_exit()
  }
}
