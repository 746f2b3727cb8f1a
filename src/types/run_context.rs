//! String-keyed run context threaded through a pipeline run.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::{AttrValue, AttractorGraph, attr_value::parse_bool};

/// Mutable key-value store for one run. Values are always strings; typed
/// readers parse on demand and fall back to the supplied default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunContext {
  values: HashMap<String, String>,
}

impl RunContext {
  pub fn new() -> Self {
    Self::default()
  }

  /// Fresh context holding only the graph attributes mirrored as `graph.<key>`.
  pub fn for_graph(graph: &AttractorGraph) -> Self {
    let mut ctx = Self::new();
    ctx.mirror_graph_attributes(graph);
    ctx
  }

  /// Rebuilds a context from flattened values (e.g. a checkpoint).
  pub fn from_values(values: HashMap<String, String>) -> Self {
    Self { values }
  }

  /// Writes every graph attribute under `graph.<key>`.
  pub fn mirror_graph_attributes(&mut self, graph: &AttractorGraph) {
    for (k, v) in &graph.attributes {
      self.values.insert(format!("graph.{}", k), v.to_string());
    }
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.values.get(key).map(String::as_str)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.values.contains_key(key)
  }

  pub fn get_string(&self, key: &str, default: &str) -> String {
    self
      .values
      .get(key)
      .cloned()
      .unwrap_or_else(|| default.to_string())
  }

  pub fn get_int(&self, key: &str, default: i64) -> i64 {
    self
      .values
      .get(key)
      .and_then(|v| v.trim().parse().ok())
      .unwrap_or(default)
  }

  pub fn get_bool(&self, key: &str, default: bool) -> bool {
    self
      .values
      .get(key)
      .and_then(|v| parse_bool(v))
      .unwrap_or(default)
  }

  pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.values.insert(key.into(), value.into());
  }

  pub fn remove(&mut self, key: &str) -> Option<String> {
    self.values.remove(key)
  }

  /// Merges typed updates, flattening each value to its string form.
  pub fn apply_updates(&mut self, updates: &HashMap<String, AttrValue>) {
    for (k, v) in updates {
      self.values.insert(k.clone(), v.to_string());
    }
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn keys(&self) -> impl Iterator<Item = &String> {
    self.values.keys()
  }

  /// Flattened copy of all values.
  pub fn values(&self) -> &HashMap<String, String> {
    &self.values
  }

  /// Sorted snapshot, convenient for logs and deterministic output.
  pub fn snapshot(&self) -> BTreeMap<String, String> {
    self
      .values
      .iter()
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect()
  }
}
