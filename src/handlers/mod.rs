//! Stage handlers and the registry that dispatches them by node type.
//!
//! The runner resolves a [Handler] for each node from its declared type
//! (`type` attribute, else derived from `shape`). Built-in handlers:
//!
//! | Type | Handler |
//! |---|---|
//! | `start`, `conditional` | [StartHandler], [ConditionalHandler] (no-op success) |
//! | `codergen` | [CodergenHandler] (prompt a [Backend]) |
//! | `tool` | [ToolHandler] (shell command) |
//! | `wait.human` | [WaitHumanHandler] (ask an [Interviewer]) |
//! | `parallel` / `parallel.fan_in` | [ParallelHandler] / [FanInHandler] |
//! | `sub_pipeline` | [SubPipelineHandler] |
//! | `stack.manager_loop` | [ManagerLoopHandler] |

mod codergen;
mod conditional;
mod fan_in;
#[cfg(test)]
mod fan_in_test;
mod manager_loop;
mod parallel;
#[cfg(test)]
mod parallel_test;
mod runner_factory;
mod start;
mod sub_pipeline;
mod tool;
#[cfg(test)]
mod tool_test;
mod wait_human;
#[cfg(test)]
mod wait_human_test;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::graph_source::{DotFileSource, GraphSource};
use crate::types::{AttractorGraph, AttractorNode, NodeOutcome, RunContext};

pub use codergen::{Backend, BackendOptions, CodergenHandler, CommandBackend};
pub use conditional::ConditionalHandler;
pub use fan_in::FanInHandler;
pub use manager_loop::{ManagerLoopHandler, parse_duration};
pub use parallel::{BranchResult, NodeExecutor, ParallelHandler, RegistryNodeExecutor};
pub use runner_factory::{PipelineRunnerFactory, RegistryRunnerFactory};
pub use start::StartHandler;
pub use sub_pipeline::SubPipelineHandler;
pub use tool::ToolHandler;
pub use wait_human::{
  AutoApproveInterviewer, Interviewer, Question, QuestionOption, QueueInterviewer,
  WaitHumanHandler,
};

/// What a handler hands back: a full outcome or bare text.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutput {
  Outcome(NodeOutcome),
  Text(String),
}

impl HandlerOutput {
  /// Bare text becomes SUCCESS with the text as notes and as `last_response`.
  pub fn into_outcome(self) -> NodeOutcome {
    match self {
      HandlerOutput::Outcome(o) => o,
      HandlerOutput::Text(t) => NodeOutcome::success(t.clone()).with_update("last_response", t),
    }
  }
}

impl From<NodeOutcome> for HandlerOutput {
  fn from(o: NodeOutcome) -> Self {
    HandlerOutput::Outcome(o)
  }
}

impl From<String> for HandlerOutput {
  fn from(t: String) -> Self {
    HandlerOutput::Text(t)
  }
}

impl From<&str> for HandlerOutput {
  fn from(t: &str) -> Self {
    HandlerOutput::Text(t.to_string())
  }
}

/// Executes one stage. An `Err` is turned into a FAIL outcome by the caller.
#[async_trait]
pub trait Handler: Send + Sync {
  async fn execute(
    &self,
    node: &AttractorNode,
    context: &RunContext,
    graph: &AttractorGraph,
    logs_root: &Path,
  ) -> Result<HandlerOutput>;
}

/// Failure reason used when no handler is registered for a node's type.
pub fn missing_handler_reason(handler_type: &str) -> String {
  format!("No handler found for node type '{}'", handler_type)
}

/// Handlers keyed by node type string.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
  handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
  /// Empty registry; nothing resolves until handlers are registered.
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder for a registry preloaded with the built-in handlers.
  pub fn builder() -> RegistryBuilder {
    RegistryBuilder::default()
  }

  /// Registers (or replaces) the handler for `handler_type`.
  pub fn register(&mut self, handler_type: impl Into<String>, handler: Arc<dyn Handler>) {
    self.handlers.insert(handler_type.into(), handler);
  }

  pub fn with(mut self, handler_type: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
    self.register(handler_type, handler);
    self
  }

  pub fn resolve(&self, handler_type: &str) -> Option<Arc<dyn Handler>> {
    self.handlers.get(handler_type).cloned()
  }

  pub fn contains(&self, handler_type: &str) -> bool {
    self.handlers.contains_key(handler_type)
  }

  /// Registered type names, sorted.
  pub fn handler_types(&self) -> Vec<String> {
    let mut types: Vec<String> = self.handlers.keys().cloned().collect();
    types.sort();
    types
  }

  /// Runs the node's handler once. Handler errors and a missing handler come back
  /// as FAIL outcomes.
  pub async fn dispatch(
    &self,
    node: &AttractorNode,
    context: &RunContext,
    graph: &AttractorGraph,
    logs_root: &Path,
  ) -> NodeOutcome {
    let handler_type = node.handler_type();
    let Some(handler) = self.resolve(&handler_type) else {
      return NodeOutcome::fail(missing_handler_reason(&handler_type));
    };
    match handler.execute(node, context, graph, logs_root).await {
      Ok(output) => output.into_outcome(),
      Err(e) => NodeOutcome::fail(e.to_string()),
    }
  }
}

/// Assembles the standard registry. Nested handlers (parallel, sub-pipeline,
/// manager loop) reach back into the finished registry through weak references.
pub struct RegistryBuilder {
  backend: Option<Arc<dyn Backend>>,
  interviewer: Arc<dyn Interviewer>,
  graph_source: Arc<dyn GraphSource>,
  cancel: CancellationToken,
  extra: Vec<(String, Arc<dyn Handler>)>,
}

impl Default for RegistryBuilder {
  fn default() -> Self {
    Self {
      backend: None,
      interviewer: Arc::new(AutoApproveInterviewer),
      graph_source: Arc::new(DotFileSource::new()),
      cancel: CancellationToken::new(),
      extra: Vec::new(),
    }
  }
}

impl RegistryBuilder {
  /// Backend for `codergen` stages; without one they simulate success.
  pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
    self.backend = Some(backend);
    self
  }

  pub fn interviewer(mut self, interviewer: Arc<dyn Interviewer>) -> Self {
    self.interviewer = interviewer;
    self
  }

  pub fn graph_source(mut self, source: Arc<dyn GraphSource>) -> Self {
    self.graph_source = source;
    self
  }

  /// Parent token for nested runs; cancelling it cancels every child run.
  pub fn cancel_token(mut self, token: CancellationToken) -> Self {
    self.cancel = token;
    self
  }

  /// Adds or overrides a handler after the built-ins are registered.
  pub fn handler(mut self, handler_type: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
    self.extra.push((handler_type.into(), handler));
    self
  }

  pub fn build(self) -> Arc<HandlerRegistry> {
    let RegistryBuilder {
      backend,
      interviewer,
      graph_source,
      cancel,
      extra,
    } = self;
    Arc::new_cyclic(|weak| {
      let executor: Arc<dyn NodeExecutor> = Arc::new(RegistryNodeExecutor::new(weak.clone()));
      let factory: Arc<dyn PipelineRunnerFactory> =
        Arc::new(RegistryRunnerFactory::new(weak.clone(), cancel));

      let mut registry = HandlerRegistry::new();
      registry.register("start", Arc::new(StartHandler));
      registry.register("conditional", Arc::new(ConditionalHandler));
      registry.register("codergen", Arc::new(CodergenHandler::new(backend)));
      registry.register("tool", Arc::new(ToolHandler));
      registry.register("wait.human", Arc::new(WaitHumanHandler::new(interviewer)));
      registry.register("parallel", Arc::new(ParallelHandler::new(executor)));
      registry.register("parallel.fan_in", Arc::new(FanInHandler));
      registry.register(
        "sub_pipeline",
        Arc::new(SubPipelineHandler::new(graph_source.clone(), factory.clone())),
      );
      registry.register(
        "stack.manager_loop",
        Arc::new(ManagerLoopHandler::new(graph_source, factory)),
      );
      for (handler_type, handler) in extra {
        registry.register(handler_type, handler);
      }
      registry
    })
  }
}
