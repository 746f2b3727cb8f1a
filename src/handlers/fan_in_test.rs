//! Tests for the fan-in handler.

use std::path::Path;

use super::fan_in::best_branch;
use super::{BranchResult, FanInHandler, Handler};
use crate::types::{AttractorGraph, AttractorNode, NodeOutcome, OutcomeStatus, RunContext};

fn result(id: &str, status: OutcomeStatus, weight: i64) -> BranchResult {
  BranchResult {
    node_id: id.to_string(),
    status,
    notes: None,
    failure_reason: None,
    weight,
  }
}

async fn run(results: Option<&[BranchResult]>) -> NodeOutcome {
  let mut ctx = RunContext::new();
  if let Some(r) = results {
    ctx.set("parallel.results", serde_json::to_string(r).unwrap());
  }
  FanInHandler
    .execute(
      &AttractorNode::new("merge"),
      &ctx,
      &AttractorGraph::default(),
      Path::new("."),
    )
    .await
    .unwrap()
    .into_outcome()
}

#[test]
fn best_prefers_weight_then_id() {
  let rs = vec![
    result("b", OutcomeStatus::Success, 1),
    result("a", OutcomeStatus::Success, 1),
    result("c", OutcomeStatus::Success, 0),
    result("z", OutcomeStatus::Fail, 9),
  ];
  assert_eq!(best_branch(&rs).unwrap().node_id, "a");
  let rs = vec![
    result("a", OutcomeStatus::Success, 0),
    result("b", OutcomeStatus::Success, 5),
  ];
  assert_eq!(best_branch(&rs).unwrap().node_id, "b");
}

#[tokio::test]
async fn selects_successful_branch() {
  let rs = [
    result("a", OutcomeStatus::Fail, 0),
    result("b", OutcomeStatus::Success, 0),
  ];
  let o = run(Some(&rs[..])).await;
  assert_eq!(o.status, OutcomeStatus::Success);
  assert_eq!(o.context_updates["parallel.fan_in.best_id"].to_string(), "b");
  assert_eq!(
    o.context_updates["parallel.fan_in.best_outcome"].to_string(),
    "success"
  );
}

#[tokio::test]
async fn all_failed_reports_failure() {
  let rs = [
    result("a", OutcomeStatus::Fail, 0),
    result("b", OutcomeStatus::Fail, 0),
  ];
  let o = run(Some(&rs[..])).await;
  assert_eq!(o.status, OutcomeStatus::Fail);
  assert!(!o.context_updates.contains_key("parallel.fan_in.best_id"));
}

#[tokio::test]
async fn missing_results_fail() {
  assert_eq!(run(None).await.status, OutcomeStatus::Fail);
}
