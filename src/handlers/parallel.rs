//! Parallel fan-out (component): runs every outgoing branch once, concurrently,
//! then hands traversal to the node all branches converge on.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{Handler, HandlerOutput, HandlerRegistry};
use crate::error::{AttractorError, Result};
use crate::types::{AttrValue, AttractorGraph, AttractorNode, NodeOutcome, OutcomeStatus, RunContext};

/// Context key holding the JSON list of branch results.
pub const PARALLEL_RESULTS_KEY: &str = "parallel.results";

const DEFAULT_MAX_PARALLEL: usize = 4;

/// Runs a single node once, outside the runner's traversal.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
  async fn execute_node(
    &self,
    node_id: &str,
    context: &RunContext,
    graph: &AttractorGraph,
    logs_root: &Path,
  ) -> NodeOutcome;
}

/// [NodeExecutor] that dispatches through a handler registry.
pub struct RegistryNodeExecutor {
  registry: Weak<HandlerRegistry>,
}

impl RegistryNodeExecutor {
  pub fn new(registry: Weak<HandlerRegistry>) -> Self {
    Self { registry }
  }
}

#[async_trait]
impl NodeExecutor for RegistryNodeExecutor {
  async fn execute_node(
    &self,
    node_id: &str,
    context: &RunContext,
    graph: &AttractorGraph,
    logs_root: &Path,
  ) -> NodeOutcome {
    let Some(registry) = self.registry.upgrade() else {
      return NodeOutcome::fail("handler registry no longer available");
    };
    let Some(node) = graph.node(node_id) else {
      return NodeOutcome::fail(format!("node not found: {}", node_id));
    };
    registry.dispatch(node, context, graph, logs_root).await
  }
}

/// One branch's result as stored under `parallel.results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchResult {
  pub node_id: String,
  pub status: OutcomeStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub failure_reason: Option<String>,
  /// Weight of the fan-out edge that led to this branch.
  #[serde(default)]
  pub weight: i64,
}

pub struct ParallelHandler {
  executor: Arc<dyn NodeExecutor>,
}

impl ParallelHandler {
  pub fn new(executor: Arc<dyn NodeExecutor>) -> Self {
    Self { executor }
  }
}

/// Node every branch's single outgoing edge leads to, or why there is none.
fn converge_node(
  graph: &AttractorGraph,
  branches: &[(String, i64)],
) -> std::result::Result<String, String> {
  let mut converge: Option<&str> = None;
  for (branch, _) in branches {
    let out = graph.outgoing_edges(branch);
    if out.len() != 1 {
      return Err(format!(
        "branch '{}' must have exactly one outgoing edge, found {}",
        branch,
        out.len()
      ));
    }
    let to = out[0].to_node.as_str();
    match converge {
      None => converge = Some(to),
      Some(c) if c == to => {}
      Some(c) => {
        return Err(format!("branches do not converge: '{}' and '{}'", c, to));
      }
    }
  }
  converge
    .map(str::to_string)
    .ok_or_else(|| "parallel node has no branches".to_string())
}

fn spawn_branch(
  set: &mut JoinSet<(usize, NodeOutcome)>,
  index: usize,
  node_id: String,
  executor: Arc<dyn NodeExecutor>,
  context: RunContext,
  graph: Arc<AttractorGraph>,
  logs_root: PathBuf,
) {
  set.spawn(async move {
    let id = node_id.clone();
    // Inner task so a panicking branch surfaces as a JoinError for this branch only.
    let joined = tokio::spawn(async move {
      executor
        .execute_node(&node_id, &context, &graph, &logs_root)
        .await
    })
    .await;
    let outcome = joined.unwrap_or_else(|e| {
      warn!(branch = %id, error = %e, "parallel branch panicked");
      NodeOutcome::fail(format!("branch '{}' panicked: {}", id, e))
    });
    (index, outcome)
  });
}

#[async_trait]
impl Handler for ParallelHandler {
  async fn execute(
    &self,
    node: &AttractorNode,
    context: &RunContext,
    graph: &AttractorGraph,
    logs_root: &Path,
  ) -> Result<HandlerOutput> {
    let branches: Vec<(String, i64)> = graph
      .outgoing_edges(&node.id)
      .into_iter()
      .map(|e| (e.to_node.clone(), e.weight()))
      .collect();
    let converge = match converge_node(graph, &branches) {
      Ok(c) => c,
      Err(reason) => return Ok(NodeOutcome::fail(reason).into()),
    };
    let max_parallel = node
      .attr("max_parallel")
      .and_then(AttrValue::as_int)
      .filter(|n| *n > 0)
      .map(|n| n as usize)
      .unwrap_or(DEFAULT_MAX_PARALLEL);
    info!(node = %node.id, branches = branches.len(), max_parallel, converge = %converge, "fan-out");

    let shared_graph = Arc::new(graph.clone());
    let branch_root = logs_root.join(&node.id);
    let mut outcomes: Vec<Option<NodeOutcome>> = vec![None; branches.len()];
    let mut set: JoinSet<(usize, NodeOutcome)> = JoinSet::new();
    let mut next = 0usize;

    loop {
      while next < branches.len() && set.len() < max_parallel {
        spawn_branch(
          &mut set,
          next,
          branches[next].0.clone(),
          self.executor.clone(),
          context.clone(),
          shared_graph.clone(),
          branch_root.clone(),
        );
        next += 1;
      }
      let Some(joined) = set.join_next().await else {
        break;
      };
      match joined {
        Ok((index, outcome)) => {
          debug!(branch = %branches[index].0, status = %outcome.status, "branch settled");
          outcomes[index] = Some(outcome);
        }
        Err(e) => warn!(error = %e, "parallel branch task failed to join"),
      }
    }

    let mut results = Vec::with_capacity(branches.len());
    let mut merged = NodeOutcome::success("");
    for ((branch, weight), outcome) in branches.iter().zip(outcomes) {
      let outcome =
        outcome.unwrap_or_else(|| NodeOutcome::fail(format!("branch '{}' did not complete", branch)));
      merged.context_updates.extend(outcome.context_updates.clone());
      merged.executed_nodes.push((branch.clone(), outcome.status));
      results.push(BranchResult {
        node_id: branch.clone(),
        status: outcome.status,
        notes: outcome.notes,
        failure_reason: outcome.failure_reason,
        weight: *weight,
      });
    }
    let succeeded = results
      .iter()
      .filter(|r| r.status == OutcomeStatus::Success)
      .count();
    let json = serde_json::to_string(&results)
      .map_err(|e| AttractorError::Handler(format!("cannot encode parallel results: {}", e)))?;

    merged.notes = Some(format!(
      "{}/{} parallel branches succeeded",
      succeeded,
      results.len()
    ));
    merged
      .context_updates
      .insert(PARALLEL_RESULTS_KEY.to_string(), AttrValue::String(json));
    merged.jump_to = Some(converge);
    Ok(merged.into())
  }
}

/// Reads `parallel.results` back from the context.
pub(crate) fn read_results(context: &RunContext) -> Option<Vec<BranchResult>> {
  let raw = context.get(PARALLEL_RESULTS_KEY)?;
  match serde_json::from_str(raw) {
    Ok(results) => Some(results),
    Err(e) => {
      warn!(error = %e, "unreadable parallel.results");
      None
    }
  }
}
