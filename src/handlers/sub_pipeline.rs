//! Sub-pipeline stage: runs a child graph to completion as one parent stage.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{Handler, HandlerOutput, PipelineRunnerFactory};
use crate::error::Result;
use crate::graph_source::GraphSource;
use crate::runner::{PipelineResult, PipelineStatus};
use crate::types::{AttractorGraph, AttractorNode, NodeOutcome, RunContext};

pub struct SubPipelineHandler {
  graphs: Arc<dyn GraphSource>,
  factory: Arc<dyn PipelineRunnerFactory>,
}

impl SubPipelineHandler {
  pub fn new(graphs: Arc<dyn GraphSource>, factory: Arc<dyn PipelineRunnerFactory>) -> Self {
    Self { graphs, factory }
  }
}

/// Parent outcome for a finished child run: status mirrored, child failure reason embedded.
pub(crate) fn child_outcome(what: &str, result: &PipelineResult) -> NodeOutcome {
  match result.status {
    PipelineStatus::Success => NodeOutcome::success(format!("{} completed", what)),
    _ => NodeOutcome::fail(format!(
      "{} {}: {}",
      what,
      result.status,
      result.failure_reason.as_deref().unwrap_or("unknown failure")
    )),
  }
}

#[async_trait]
impl Handler for SubPipelineHandler {
  async fn execute(
    &self,
    node: &AttractorNode,
    _context: &RunContext,
    _graph: &AttractorGraph,
    logs_root: &Path,
  ) -> Result<HandlerOutput> {
    let Some(reference) = node.attr_string("sub_pipeline").filter(|r| !r.trim().is_empty()) else {
      return Ok(NodeOutcome::fail("sub_pipeline attribute missing").into());
    };
    let child = self.graphs.load(&reference)?;
    let child_root = logs_root.join(&node.id);
    info!(node = %node.id, child = %reference, logs_root = %child_root.display(), "starting sub-pipeline");
    let runner = self.factory.create_runner(&child, &child_root)?;
    let result = runner.run(&child).await?;
    info!(node = %node.id, status = %result.status, "sub-pipeline finished");

    let completed = serde_json::Value::from(result.completed_nodes.clone()).to_string();
    let outcome = child_outcome(&format!("sub-pipeline '{}'", reference), &result)
      .with_update(format!("sub_pipeline.{}.status", node.id), result.status.as_str())
      .with_update(format!("sub_pipeline.{}.completedNodes", node.id), completed);
    Ok(outcome.into())
  }
}
