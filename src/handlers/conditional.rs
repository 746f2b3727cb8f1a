//! Conditional (diamond) stage. Routing happens on its outgoing edges.

use std::path::Path;

use async_trait::async_trait;

use super::{Handler, HandlerOutput};
use crate::error::Result;
use crate::types::{AttractorGraph, AttractorNode, NodeOutcome, RunContext};

#[derive(Debug, Default, Clone, Copy)]
pub struct ConditionalHandler;

#[async_trait]
impl Handler for ConditionalHandler {
  async fn execute(
    &self,
    node: &AttractorNode,
    _context: &RunContext,
    _graph: &AttractorGraph,
    _logs_root: &Path,
  ) -> Result<HandlerOutput> {
    Ok(NodeOutcome::success(format!("Conditional node evaluated: {}", node.id)).into())
  }
}
