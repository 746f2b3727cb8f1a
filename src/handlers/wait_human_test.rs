//! Tests for the human gate handler and interviewers.

use std::path::Path;
use std::sync::Arc;

use super::{
  AutoApproveInterviewer, Handler, Interviewer, Question, QuestionOption, QueueInterviewer,
  WaitHumanHandler,
};
use crate::types::{AttractorEdge, AttractorGraph, AttractorNode, NodeOutcome, OutcomeStatus, RunContext};

fn gate_graph() -> AttractorGraph {
  AttractorGraph::new("g")
    .with_node(AttractorNode::new("review").with_attr("shape", "hexagon"))
    .with_node(AttractorNode::new("ship"))
    .with_node(AttractorNode::new("fix"))
    .with_edge(AttractorEdge::new("review", "ship").with_attr("label", "[A] Approve"))
    .with_edge(AttractorEdge::new("review", "fix").with_attr("label", "[F] Fix"))
}

async fn run(interviewer: Arc<dyn Interviewer>, graph: &AttractorGraph) -> NodeOutcome {
  WaitHumanHandler::new(interviewer)
    .execute(
      &graph.nodes["review"],
      &RunContext::new(),
      graph,
      Path::new("."),
    )
    .await
    .unwrap()
    .into_outcome()
}

#[tokio::test]
async fn auto_approve_picks_first_edge() {
  let o = run(Arc::new(AutoApproveInterviewer), &gate_graph()).await;
  assert_eq!(o.status, OutcomeStatus::Success);
  assert_eq!(o.preferred_label.as_deref(), Some("[A] Approve"));
  assert_eq!(o.suggested_next_ids, vec!["ship".to_string()]);
}

#[tokio::test]
async fn queue_answer_matches_label_without_accelerator() {
  let o = run(Arc::new(QueueInterviewer::new(["fix"])), &gate_graph()).await;
  assert_eq!(o.suggested_next_ids, vec!["fix".to_string()]);
  assert_eq!(o.context_updates["human.gate.selected"].to_string(), "fix");
}

#[tokio::test]
async fn exhausted_queue_fails() {
  let o = run(Arc::new(QueueInterviewer::new(Vec::<String>::new())), &gate_graph()).await;
  assert_eq!(o.status, OutcomeStatus::Fail);
}

#[tokio::test]
async fn no_outgoing_edges_fails() {
  let g = AttractorGraph::new("g").with_node(AttractorNode::new("review"));
  let o = run(Arc::new(AutoApproveInterviewer), &g).await;
  assert_eq!(o.status, OutcomeStatus::Fail);
}

#[tokio::test]
async fn queue_interviewer_replays_in_order() {
  let q = QueueInterviewer::new(["a", "b"]);
  let question = Question {
    stage: "s".to_string(),
    text: "?".to_string(),
    options: vec![QuestionOption {
      label: "a".to_string(),
      target: "x".to_string(),
    }],
  };
  assert_eq!(q.ask(&question).await.as_deref(), Some("a"));
  assert_eq!(q.ask(&question).await.as_deref(), Some("b"));
  assert_eq!(q.ask(&question).await, None);
}
