//! Tests for the parallel fan-out handler.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{BranchResult, Handler, HandlerRegistry, NodeExecutor, ParallelHandler};
use crate::types::{AttrValue, AttractorEdge, AttractorGraph, AttractorNode, NodeOutcome, OutcomeStatus, RunContext};

/// Fails `bad`, panics on `boom`, succeeds otherwise; tracks peak concurrency.
#[derive(Default)]
struct Scripted {
  running: AtomicUsize,
  peak: AtomicUsize,
}

#[async_trait]
impl NodeExecutor for Scripted {
  async fn execute_node(
    &self,
    node_id: &str,
    _context: &RunContext,
    _graph: &AttractorGraph,
    _logs_root: &Path,
  ) -> NodeOutcome {
    let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(10)).await;
    self.running.fetch_sub(1, Ordering::SeqCst);
    match node_id {
      "bad" => NodeOutcome::fail("bad branch"),
      "boom" => panic!("branch exploded"),
      other => NodeOutcome::success(other.to_string()).with_update(format!("done.{}", other), true),
    }
  }
}

fn fan_out(branches: &[&str]) -> AttractorGraph {
  let mut g = AttractorGraph::new("g")
    .with_node(AttractorNode::new("fan").with_attr("shape", "component"))
    .with_node(AttractorNode::new("merge").with_attr("shape", "tripleoctagon"));
  for b in branches {
    g = g
      .with_node(AttractorNode::new(*b))
      .with_edge(AttractorEdge::new("fan", *b))
      .with_edge(AttractorEdge::new(*b, "merge"));
  }
  g
}

async fn run(executor: Arc<dyn NodeExecutor>, graph: &AttractorGraph) -> NodeOutcome {
  ParallelHandler::new(executor)
    .execute(&graph.nodes["fan"], &RunContext::new(), graph, Path::new("."))
    .await
    .unwrap()
    .into_outcome()
}

fn results(o: &NodeOutcome) -> Vec<BranchResult> {
  serde_json::from_str(&o.context_updates["parallel.results"].to_string()).unwrap()
}

#[tokio::test]
async fn all_branches_run_and_jump_to_converge() {
  let g = fan_out(&["a", "b", "c"]);
  let o = run(Arc::new(Scripted::default()), &g).await;
  assert_eq!(o.status, OutcomeStatus::Success);
  assert_eq!(o.jump_to.as_deref(), Some("merge"));
  let rs = results(&o);
  let ids: Vec<_> = rs.iter().map(|r| r.node_id.as_str()).collect();
  assert_eq!(ids, vec!["a", "b", "c"]);
  assert!(rs.iter().all(|r| r.status == OutcomeStatus::Success));
  assert_eq!(o.executed_nodes.len(), 3);
  assert_eq!(o.context_updates["done.b"].to_string(), "true");
}

#[tokio::test]
async fn failures_and_panics_are_isolated() {
  let g = fan_out(&["a", "bad", "boom"]);
  let o = run(Arc::new(Scripted::default()), &g).await;
  assert_eq!(o.status, OutcomeStatus::Success);
  let rs = results(&o);
  assert_eq!(rs[0].status, OutcomeStatus::Success);
  assert_eq!(rs[1].status, OutcomeStatus::Fail);
  assert_eq!(rs[1].failure_reason.as_deref(), Some("bad branch"));
  assert_eq!(rs[2].status, OutcomeStatus::Fail);
  assert!(rs[2].failure_reason.as_deref().unwrap().contains("panicked"));
}

#[tokio::test]
async fn concurrency_is_bounded_by_max_parallel() {
  let mut g = fan_out(&["a", "b", "c", "d", "e"]);
  g.nodes.get_mut("fan").unwrap().attributes.insert("max_parallel".into(), AttrValue::Integer(2));
  let exec = Arc::new(Scripted::default());
  let o = run(exec.clone(), &g).await;
  assert_eq!(results(&o).len(), 5);
  assert!(exec.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn diverging_branches_fail_before_running() {
  let g = fan_out(&["a", "b"])
    .with_node(AttractorNode::new("elsewhere"))
    .with_edge(AttractorEdge::new("b", "elsewhere"));
  let exec = Arc::new(Scripted::default());
  let o = run(exec.clone(), &g).await;
  assert_eq!(o.status, OutcomeStatus::Fail);
  assert_eq!(exec.peak.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn branches_with_different_targets_fail() {
  let g = AttractorGraph::new("g")
    .with_node(AttractorNode::new("fan"))
    .with_edge(AttractorEdge::new("fan", "a"))
    .with_edge(AttractorEdge::new("fan", "b"))
    .with_edge(AttractorEdge::new("a", "x"))
    .with_edge(AttractorEdge::new("b", "y"));
  let o = run(Arc::new(Scripted::default()), &g).await;
  assert_eq!(o.status, OutcomeStatus::Fail);
  assert!(o.failure_reason.unwrap().contains("do not converge"));
}

#[tokio::test]
async fn no_branches_fails() {
  let g = AttractorGraph::new("g").with_node(AttractorNode::new("fan"));
  let o = run(Arc::new(Scripted::default()), &g).await;
  assert_eq!(o.status, OutcomeStatus::Fail);
}

#[tokio::test]
async fn registry_executor_dispatches_branch_handlers() {
  let registry = HandlerRegistry::builder().build();
  let g = fan_out(&["a", "b"]);
  let dir = tempfile::tempdir().unwrap();
  let parallel = registry.resolve("parallel").unwrap();
  let o = parallel
    .execute(&g.nodes["fan"], &RunContext::new(), &g, dir.path())
    .await
    .unwrap()
    .into_outcome();
  let rs = results(&o);
  assert!(rs.iter().all(|r| r.status == OutcomeStatus::Success));
  assert!(dir.path().join("fan").join("a").join("prompt.md").exists());
}
