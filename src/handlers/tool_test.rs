//! Tests for the tool handler.

use std::path::Path;

use super::{Handler, ToolHandler};
use crate::types::{AttractorGraph, AttractorNode, OutcomeStatus, RunContext};

async fn run(node: AttractorNode) -> crate::types::NodeOutcome {
  ToolHandler
    .execute(&node, &RunContext::new(), &AttractorGraph::default(), Path::new("."))
    .await
    .unwrap()
    .into_outcome()
}

#[tokio::test]
async fn success_captures_stdout() {
  let o = run(AttractorNode::new("t").with_attr("tool_command", "echo hi")).await;
  assert_eq!(o.status, OutcomeStatus::Success);
  assert_eq!(o.context_updates["tool.output"].to_string(), "hi");
}

#[tokio::test]
async fn nonzero_exit_fails() {
  let o = run(AttractorNode::new("t").with_attr("tool_command", "exit 3")).await;
  assert_eq!(o.status, OutcomeStatus::Fail);
  assert_eq!(o.failure_reason.as_deref(), Some("exit 3"));
}

#[tokio::test]
async fn missing_command_fails() {
  let o = run(AttractorNode::new("t")).await;
  assert_eq!(o.status, OutcomeStatus::Fail);
  assert_eq!(o.failure_reason.as_deref(), Some("No tool_command specified"));
}
