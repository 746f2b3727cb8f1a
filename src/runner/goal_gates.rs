//! Goal gates: nodes that must have succeeded before the run may complete.

use std::collections::HashMap;

use tracing::instrument;

use crate::types::{AttractorGraph, OutcomeStatus};

/// Result of checking goal gates when the run is about to complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GateCheck {
  /// Every goal gate passed.
  Passed,
  /// Gate `gate` failed; resume at `target`.
  Redirect { gate: String, target: String },
  /// Gate failed and no retry target resolves to a node.
  Unsatisfied { gate: String },
}

/// Returns true if the recorded status satisfies a goal gate.
#[instrument(level = "trace")]
pub(crate) fn goal_gate_passed(status: OutcomeStatus) -> bool {
  status == OutcomeStatus::Success
}

/// Checks goal-gate nodes among `outcomes` (the current segment). Gates are
/// visited in id order; the node's `retry_target` wins over the graph's.
#[instrument(level = "trace", skip(graph, outcomes))]
pub(crate) fn check_goal_gates(
  graph: &AttractorGraph,
  outcomes: &HashMap<String, OutcomeStatus>,
) -> GateCheck {
  let mut ids: Vec<&String> = outcomes.keys().collect();
  ids.sort();
  for id in ids {
    let Some(node) = graph.node(id) else {
      continue;
    };
    if !node.goal_gate() || goal_gate_passed(outcomes[id]) {
      continue;
    }
    let target = node
      .retry_target()
      .or_else(|| graph.attr_string("retry_target"))
      .filter(|t| graph.node(t).is_some());
    return match target {
      Some(target) => GateCheck::Redirect {
        gate: id.clone(),
        target,
      },
      None => GateCheck::Unsatisfied { gate: id.clone() },
    };
  }
  GateCheck::Passed
}
