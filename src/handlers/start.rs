//! Start stage: no work, always succeeds.

use std::path::Path;

use async_trait::async_trait;

use super::{Handler, HandlerOutput};
use crate::error::Result;
use crate::types::{AttractorGraph, AttractorNode, NodeOutcome, RunContext};

#[derive(Debug, Default, Clone, Copy)]
pub struct StartHandler;

#[async_trait]
impl Handler for StartHandler {
  async fn execute(
    &self,
    _node: &AttractorNode,
    _context: &RunContext,
    _graph: &AttractorGraph,
    _logs_root: &Path,
  ) -> Result<HandlerOutput> {
    Ok(NodeOutcome::success("Start").into())
  }
}
