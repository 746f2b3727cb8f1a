//! Parsed Attractor pipeline graph.

use std::collections::HashMap;

use super::{AttrValue, AttractorEdge, AttractorNode};

/// Immutable description of a pipeline: graph attributes, nodes by id, ordered edges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttractorGraph {
  pub name: String,
  pub attributes: HashMap<String, AttrValue>,
  pub nodes: HashMap<String, AttractorNode>,
  pub edges: Vec<AttractorEdge>,
}

impl AttractorGraph {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
    self.attributes.insert(key.into(), value.into());
    self
  }

  pub fn with_node(mut self, node: AttractorNode) -> Self {
    self.nodes.insert(node.id.clone(), node);
    self
  }

  pub fn with_edge(mut self, edge: AttractorEdge) -> Self {
    self.edges.push(edge);
    self
  }

  /// Graph goal (`goal` attribute), empty when undeclared.
  pub fn goal(&self) -> String {
    self
      .attributes
      .get("goal")
      .map(|v| v.to_string())
      .unwrap_or_default()
  }

  pub fn attr_string(&self, key: &str) -> Option<String> {
    self
      .attributes
      .get(key)
      .map(|v| v.to_string())
      .filter(|s| !s.trim().is_empty())
  }

  /// Graph-wide fallback for node `max_retries`.
  pub fn default_max_retry(&self) -> Option<u32> {
    self
      .attributes
      .get("default_max_retry")
      .and_then(AttrValue::as_int)
      .map(|n| u32::try_from(n.max(0)).unwrap_or(u32::MAX))
  }

  pub fn node(&self, id: &str) -> Option<&AttractorNode> {
    self.nodes.get(id)
  }

  /// Effective retry budget for a node: node attribute, graph default, then 0.
  pub fn max_retries_for(&self, node: &AttractorNode) -> u32 {
    node
      .max_retries()
      .or_else(|| self.default_max_retry())
      .unwrap_or(0)
  }

  /// Start node. When several qualify the lexically smallest id wins.
  pub fn find_start(&self) -> Option<&AttractorNode> {
    self
      .nodes
      .values()
      .filter(|n| n.is_start())
      .min_by(|a, b| a.id.cmp(&b.id))
  }

  pub fn find_exit(&self) -> Option<&AttractorNode> {
    self
      .nodes
      .values()
      .filter(|n| n.is_exit())
      .min_by(|a, b| a.id.cmp(&b.id))
  }

  /// Edges leaving `node_id`, in declaration order.
  pub fn outgoing_edges(&self, node_id: &str) -> Vec<&AttractorEdge> {
    self
      .edges
      .iter()
      .filter(|e| e.from_node == node_id)
      .collect()
  }
}
