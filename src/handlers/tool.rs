//! Tool (parallelogram) stage: runs the node's `tool_command` through `sh -c`.

use std::path::Path;
use std::process::Command;

use async_trait::async_trait;
use tracing::info;

use super::{Handler, HandlerOutput};
use crate::error::{AttractorError, Result};
use crate::types::{AttractorGraph, AttractorNode, NodeOutcome, RunContext};

#[derive(Debug, Default, Clone, Copy)]
pub struct ToolHandler;

#[async_trait]
impl Handler for ToolHandler {
  async fn execute(
    &self,
    node: &AttractorNode,
    _context: &RunContext,
    _graph: &AttractorGraph,
    logs_root: &Path,
  ) -> Result<HandlerOutput> {
    let Some(cmd) = node.attr_string("tool_command").filter(|c| !c.trim().is_empty()) else {
      return Ok(NodeOutcome::fail("No tool_command specified").into());
    };
    info!(node = %node.id, command = %cmd, "running");
    let cwd = logs_root.to_path_buf();
    let output = tokio::task::spawn_blocking(move || {
      let mut command = Command::new("sh");
      command.arg("-c").arg(&cmd);
      if cwd.is_dir() {
        command.current_dir(&cwd);
      }
      command.output()
    })
    .await
    .map_err(|e| AttractorError::Handler(format!("tool task: {}", e)))?
    .map_err(|e| AttractorError::Handler(format!("tool spawn: {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let outcome = if output.status.success() {
      info!(node = %node.id, "finished: success");
      NodeOutcome::success(format!("Tool completed: {}", stdout))
    } else {
      info!(node = %node.id, "finished: error");
      NodeOutcome::fail(format!("exit {}", output.status.code().unwrap_or(-1)))
    };
    Ok(outcome.with_update("tool.output", stdout).into())
  }
}
