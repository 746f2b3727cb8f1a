//! Fan-in (tripleoctagon): picks the authoritative branch from `parallel.results`.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use super::parallel::{BranchResult, read_results};
use super::{Handler, HandlerOutput};
use crate::error::Result;
use crate::types::{AttractorGraph, AttractorNode, NodeOutcome, OutcomeStatus, RunContext};

/// Best successful branch: highest fan-out edge weight, then smallest node id.
pub(crate) fn best_branch(results: &[BranchResult]) -> Option<&BranchResult> {
  results
    .iter()
    .filter(|r| r.status == OutcomeStatus::Success)
    .min_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.node_id.cmp(&b.node_id)))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FanInHandler;

#[async_trait]
impl Handler for FanInHandler {
  async fn execute(
    &self,
    node: &AttractorNode,
    context: &RunContext,
    _graph: &AttractorGraph,
    _logs_root: &Path,
  ) -> Result<HandlerOutput> {
    let Some(results) = read_results(context).filter(|r| !r.is_empty()) else {
      return Ok(NodeOutcome::fail("no parallel results to merge").into());
    };
    let Some(best) = best_branch(&results) else {
      return Ok(
        NodeOutcome::fail(format!("all {} parallel branches failed", results.len()))
          .with_update("parallel.fan_in.best_outcome", OutcomeStatus::Fail.as_str())
          .into(),
      );
    };
    info!(node = %node.id, best = %best.node_id, "fan-in selected branch");
    Ok(
      NodeOutcome::success(format!("Selected best candidate: {}", best.node_id))
        .with_update("parallel.fan_in.best_id", best.node_id.clone())
        .with_update("parallel.fan_in.best_outcome", best.status.as_str())
        .into(),
    )
  }
}
