//! Deterministic next-edge selection.
//!
//! Evaluated in order, each step short-circuiting on a match:
//! 1. edges whose condition evaluates true (best by weight, then target id)
//! 2. preferred-label match among eligible edges
//! 3. suggested-next-id match among eligible edges
//! 4. best eligible edge by weight, then target id
//!
//! An edge is eligible when it has no condition or its condition evaluates true.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

use crate::condition::evaluate_condition;
use crate::types::{AttractorEdge, AttractorGraph, NodeOutcome, RunContext};

/// Leading accelerator forms: `[Y] `, `Y) `, `Y - `.
static ACCELERATOR: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(?:\[[^\]]+\]\s*|[A-Za-z0-9]\)\s+|[A-Za-z0-9]\s+-\s+)").expect("valid regex")
});

/// Normalizes a label for comparison: strips the accelerator, trims, lowercases.
pub fn normalize_label(label: &str) -> String {
  let trimmed = label.trim();
  ACCELERATOR.replace(trimmed, "").trim().to_lowercase()
}

/// Picks the best edge by weight (descending), then lexically by target id.
pub fn best_by_weight_then_lexical<'a>(edges: &[&'a AttractorEdge]) -> Option<&'a AttractorEdge> {
  edges.iter().copied().min_by(|a, b| {
    b.weight()
      .cmp(&a.weight())
      .then_with(|| a.to_node.cmp(&b.to_node))
  })
}

/// Selects the next edge leaving `node_id`, or `None` when no edge is eligible.
#[instrument(level = "trace", skip(outcome, context, graph))]
pub fn select_edge<'g>(
  node_id: &str,
  outcome: &NodeOutcome,
  context: &RunContext,
  graph: &'g AttractorGraph,
) -> Option<&'g AttractorEdge> {
  let edges = graph.outgoing_edges(node_id);
  if edges.is_empty() {
    return None;
  }

  let mut matched = Vec::new();
  let mut eligible = Vec::new();
  for e in &edges {
    match e.condition() {
      Some(c) => {
        if evaluate_condition(&c, outcome, context) {
          matched.push(*e);
          eligible.push(*e);
        }
      }
      None => eligible.push(*e),
    }
  }

  if let Some(best) = best_by_weight_then_lexical(&matched) {
    debug!(node_id, to = %best.to_node, "edge selected by condition");
    return Some(best);
  }

  if let Some(pref) = outcome
    .preferred_label
    .as_deref()
    .filter(|p| !p.trim().is_empty())
  {
    let wanted = normalize_label(pref);
    if let Some(e) = eligible
      .iter()
      .find(|e| e.label().is_some_and(|l| normalize_label(&l) == wanted))
    {
      debug!(node_id, to = %e.to_node, "edge selected by preferred label");
      return Some(*e);
    }
  }

  for sid in &outcome.suggested_next_ids {
    if let Some(e) = eligible.iter().find(|e| e.to_node == *sid) {
      debug!(node_id, to = %e.to_node, "edge selected by suggested next id");
      return Some(*e);
    }
  }

  let best = best_by_weight_then_lexical(&eligible);
  if let Some(e) = best {
    debug!(node_id, to = %e.to_node, "edge selected by weight");
  }
  best
}
