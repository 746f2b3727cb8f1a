//! Pipeline runner: drives a graph from its start node to a terminal state.
//!
//! One stage executes at a time. After each stage the runner merges the
//! outcome into the context, records it, writes a checkpoint and asks the edge
//! selector where to go next. Retries, `retry_target` redirects, goal gates,
//! `loop_restart` edges and cancellation are handled here.
//!
//! - [PipelineRunner::run]: start a fresh run at the start node.
//! - [PipelineRunner::resume]: continue from a checkpoint without re-executing completed nodes.

mod goal_gates;
mod state;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::checkpoint_io::{load_checkpoint, save_checkpoint};
use crate::error::{AttractorError, Result};
use crate::events::{EventEmitter, NoopEmitter};
use crate::handlers::{HandlerRegistry, missing_handler_reason};
use crate::select_edge::select_edge;
use crate::types::{
  AttractorGraph, AttractorNode, EventKind, NodeOutcome, OutcomeStatus, PipelineEvent, RunContext,
};
use goal_gates::{GateCheck, check_goal_gates};
use state::RunState;

/// Default directory for checkpoints and stage logs.
pub const DEFAULT_LOGS_ROOT: &str = ".attractor";

/// Default bound on executed stages per run.
pub const DEFAULT_MAX_STEPS: usize = 1000;

/// Context key carrying the fidelity mode for the next stage.
pub const FIDELITY_KEY: &str = "_fidelity.mode";

/// Fidelity forced on the first stage executed after a resume.
pub const RESUME_FIDELITY: &str = "summary:high";

/// Runner settings.
#[derive(Clone)]
pub struct RunnerConfig {
  pub logs_root: PathBuf,
  pub run_id: String,
  pub cancel: CancellationToken,
  pub emitter: Arc<dyn EventEmitter>,
  pub max_steps: usize,
}

impl Default for RunnerConfig {
  fn default() -> Self {
    Self {
      logs_root: PathBuf::from(DEFAULT_LOGS_ROOT),
      run_id: uuid::Uuid::new_v4().to_string(),
      cancel: CancellationToken::new(),
      emitter: Arc::new(NoopEmitter),
      max_steps: DEFAULT_MAX_STEPS,
    }
  }
}

impl RunnerConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_logs_root(mut self, logs_root: impl AsRef<Path>) -> Self {
    self.logs_root = logs_root.as_ref().to_path_buf();
    self
  }

  pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
    self.run_id = run_id.into();
    self
  }

  pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
    self.cancel = cancel;
    self
  }

  pub fn with_emitter(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
    self.emitter = emitter;
    self
  }

  pub fn with_max_steps(mut self, max_steps: usize) -> Self {
    self.max_steps = max_steps;
    self
  }
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
  Success,
  Fail,
  Cancelled,
}

impl PipelineStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      PipelineStatus::Success => "success",
      PipelineStatus::Fail => "fail",
      PipelineStatus::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for PipelineStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Final result of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
  pub status: PipelineStatus,
  pub failure_reason: Option<String>,
  /// Outcome of the last stage (or the terminal failure).
  pub last_outcome: Option<NodeOutcome>,
  /// Completed nodes of the current segment (after the last restart).
  pub completed_nodes: Vec<String>,
  /// Full completion log with restart markers.
  pub completed_log: Vec<String>,
  pub node_retries: BTreeMap<String, u32>,
  pub context: RunContext,
  pub restart_count: u32,
  pub run_id: String,
  /// Logs directory of the final segment.
  pub logs_root: PathBuf,
}

impl PipelineResult {
  pub fn is_success(&self) -> bool {
    self.status == PipelineStatus::Success
  }
}

/// What happens after a stage.
enum Flow {
  Next(String),
  Finish(Finish),
}

enum Finish {
  Success,
  Fail(String),
  Cancelled,
}

/// Result of executing one stage (with its retries).
enum Stage {
  Completed(NodeOutcome),
  /// Terminal failure that bypasses edge selection.
  Aborted(String),
  Cancelled,
}

/// Executes pipeline graphs against a handler registry.
#[derive(Clone)]
pub struct PipelineRunner {
  registry: Arc<HandlerRegistry>,
  config: RunnerConfig,
}

impl PipelineRunner {
  pub fn new(registry: Arc<HandlerRegistry>) -> Self {
    Self::with_config(registry, RunnerConfig::default())
  }

  pub fn with_config(registry: Arc<HandlerRegistry>, config: RunnerConfig) -> Self {
    Self { registry, config }
  }

  /// Replaces the cancellation token.
  pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
    self.config.cancel = cancel;
    self
  }

  pub fn cancel_token(&self) -> CancellationToken {
    self.config.cancel.clone()
  }

  pub fn config(&self) -> &RunnerConfig {
    &self.config
  }

  pub fn registry(&self) -> &Arc<HandlerRegistry> {
    &self.registry
  }

  /// Runs `graph` from its start node.
  #[instrument(level = "trace", skip_all, fields(graph = %graph.name))]
  pub async fn run(&self, graph: &AttractorGraph) -> Result<PipelineResult> {
    let start = graph
      .find_start()
      .ok_or_else(|| AttractorError::InvalidGraph("no start node (shape=Mdiamond or id 'start')".to_string()))?
      .id
      .clone();
    let state = RunState::fresh(graph, &self.config.run_id, &self.config.logs_root);
    info!(run_id = %state.run_id, graph = %graph.name, start = %start, "pipeline starting");
    self.emit(
      PipelineEvent::new(EventKind::PipelineStarted, &state.run_id)
        .with("graph", graph.name.clone())
        .with("logsRoot", state.logs_root.display().to_string()),
    );
    self.drive(graph, state, start, None).await
  }

  /// Continues a run from the checkpoint at `checkpoint_path`.
  ///
  /// Nodes already completed in the checkpointed segment are never executed
  /// again; traversal picks up at the edge selected from the checkpoint's
  /// current node and its recorded status.
  #[instrument(level = "trace", skip_all, fields(graph = %graph.name))]
  pub async fn resume(&self, graph: &AttractorGraph, checkpoint_path: &Path) -> Result<PipelineResult> {
    let cp = load_checkpoint(checkpoint_path)?;
    let node = graph
      .node(&cp.current_node)
      .ok_or_else(|| AttractorError::NodeNotFound(cp.current_node.clone()))?;
    let mut state = RunState::from_checkpoint(&cp, graph, &self.config.logs_root);
    info!(
      run_id = %state.run_id,
      current_node = %cp.current_node,
      completed = cp.completed_nodes.len(),
      "resuming pipeline"
    );
    self.emit(
      PipelineEvent::new(EventKind::PipelineStarted, &state.run_id)
        .with("graph", graph.name.clone())
        .with("resumedFrom", cp.current_node.clone())
        .with("logsRoot", state.logs_root.display().to_string()),
    );

    let status = state
      .node_outcomes
      .get(&cp.current_node)
      .copied()
      .unwrap_or(OutcomeStatus::Success);
    let outcome = NodeOutcome::from_status(status);
    match self.route(graph, &mut state, node, &outcome)? {
      Flow::Next(next) => self.drive(graph, state, next, Some(outcome)).await,
      Flow::Finish(finish) => Ok(self.finish(state, finish, Some(outcome))),
    }
  }

  fn emit(&self, event: PipelineEvent) {
    debug!(kind = %event.kind, data = ?event.data, "event");
    self.config.emitter.emit(event);
  }

  async fn drive(
    &self,
    graph: &AttractorGraph,
    mut state: RunState,
    first: String,
    mut last: Option<NodeOutcome>,
  ) -> Result<PipelineResult> {
    let mut current = first;
    let mut steps = 0usize;
    loop {
      if self.config.cancel.is_cancelled() {
        return Ok(self.finish(state, Finish::Cancelled, last));
      }
      let node = graph
        .node(&current)
        .ok_or_else(|| AttractorError::NodeNotFound(current.clone()))?;

      if node.is_terminal() {
        match check_goal_gates(graph, &state.node_outcomes) {
          GateCheck::Passed => return Ok(self.finish(state, Finish::Success, last)),
          GateCheck::Redirect { gate, target } => {
            warn!(gate = %gate, target = %target, "goal gate unsatisfied, redirecting");
            current = target;
            continue;
          }
          GateCheck::Unsatisfied { gate } => {
            let reason = format!("goal gate '{}' unsatisfied", gate);
            return Ok(self.finish(state, Finish::Fail(reason), last));
          }
        }
      }

      let outcome = match state.resumed.remove(&current) {
        Some(status) => {
          debug!(node = %current, status = %status, "already completed before resume, not executing");
          NodeOutcome::from_status(status)
        }
        None => {
          steps += 1;
          if steps > self.config.max_steps {
            let reason = "step limit exceeded".to_string();
            return Ok(self.finish(state, Finish::Fail(reason), last));
          }
          match self.execute_stage(graph, node, &mut state).await? {
            Stage::Completed(outcome) => outcome,
            Stage::Aborted(reason) => {
              let outcome = NodeOutcome::fail(reason.clone());
              return Ok(self.finish(state, Finish::Fail(reason), Some(outcome)));
            }
            Stage::Cancelled => return Ok(self.finish(state, Finish::Cancelled, last)),
          }
        }
      };

      let flow = self.route(graph, &mut state, node, &outcome)?;
      last = Some(outcome);
      match flow {
        Flow::Next(next) => current = next,
        Flow::Finish(finish) => return Ok(self.finish(state, finish, last)),
      }
    }
  }

  /// Executes `node` until it stops asking for a retry, then records it and
  /// writes a checkpoint.
  async fn execute_stage(
    &self,
    graph: &AttractorGraph,
    node: &AttractorNode,
    state: &mut RunState,
  ) -> Result<Stage> {
    let handler_type = node.handler_type();
    let Some(handler) = self.registry.resolve(&handler_type) else {
      let reason = missing_handler_reason(&handler_type);
      error!(node = %node.id, handler_type = %handler_type, "no handler registered");
      self.emit(
        PipelineEvent::new(EventKind::StageFailed, &state.run_id)
          .with("nodeId", node.id.clone())
          .with("status", OutcomeStatus::Fail.as_str())
          .with("reason", reason.clone()),
      );
      return Ok(Stage::Aborted(reason));
    };

    if state.resume_fidelity_pending {
      state.context.set(FIDELITY_KEY, RESUME_FIDELITY);
      state.resume_fidelity_pending = false;
    }
    state.context.set("current_node", node.id.clone());

    let max_retries = graph.max_retries_for(node);
    let mut attempt: u32 = 0;
    let outcome = loop {
      attempt += 1;
      let total = state.count_attempt(&node.id);
      info!(node = %node.id, handler_type = %handler_type, attempt, total, "executing stage");
      self.emit(
        PipelineEvent::new(EventKind::StageStarted, &state.run_id)
          .with("nodeId", node.id.clone())
          .with("attempt", attempt),
      );

      let mut outcome = match handler
        .execute(node, &state.context, graph, &state.logs_root)
        .await
      {
        Ok(output) => output.into_outcome(),
        Err(e) => {
          warn!(node = %node.id, error = %e, "handler returned an error");
          NodeOutcome::fail(e.to_string())
        }
      };
      apply_outcome(&mut state.context, &outcome);

      if outcome.status == OutcomeStatus::Retry {
        if attempt <= max_retries {
          state
            .context
            .set(format!("internal.retry_count.{}", node.id), attempt.to_string());
          warn!(node = %node.id, attempt, max_retries, "stage requested retry");
          self.emit(
            PipelineEvent::new(EventKind::StageFailed, &state.run_id)
              .with("nodeId", node.id.clone())
              .with("status", OutcomeStatus::Retry.as_str())
              .with("reason", outcome.failure_reason.clone().unwrap_or_default())
              .with("attempt", attempt),
          );
          if self.config.cancel.is_cancelled() {
            return Ok(Stage::Cancelled);
          }
          continue;
        }
        warn!(node = %node.id, max_retries, "retries exhausted");
        outcome.status = OutcomeStatus::Fail;
        outcome.failure_reason = Some(format!("max retries exceeded for '{}'", node.id));
        state.context.set("outcome", OutcomeStatus::Fail.as_str());
      }
      break outcome;
    };

    if outcome.is_success() {
      self.emit(
        PipelineEvent::new(EventKind::StageCompleted, &state.run_id)
          .with("nodeId", node.id.clone())
          .with("status", outcome.status.as_str()),
      );
    } else {
      self.emit(
        PipelineEvent::new(EventKind::StageFailed, &state.run_id)
          .with("nodeId", node.id.clone())
          .with("status", outcome.status.as_str())
          .with("reason", outcome.failure_reason.clone().unwrap_or_default()),
      );
    }

    state.record(&node.id, outcome.status);
    for (id, status) in &outcome.executed_nodes {
      state.count_attempt(id);
      state.record(id, *status);
    }

    let path = state.checkpoint_path();
    save_checkpoint(&path, &state.checkpoint(&node.id))?;
    debug!(node = %node.id, path = %path.display(), "checkpoint saved");
    self.emit(
      PipelineEvent::new(EventKind::CheckpointSaved, &state.run_id)
        .with("nodeId", node.id.clone())
        .with("path", path.display().to_string()),
    );
    Ok(Stage::Completed(outcome))
  }

  /// Decides where traversal goes after `node` produced `outcome`.
  fn route(
    &self,
    graph: &AttractorGraph,
    state: &mut RunState,
    node: &AttractorNode,
    outcome: &NodeOutcome,
  ) -> Result<Flow> {
    if let Some(target) = &outcome.jump_to {
      if graph.node(target).is_none() {
        return Err(AttractorError::NodeNotFound(target.clone()));
      }
      debug!(node = %node.id, target = %target, "continuing at converge node");
      return Ok(Flow::Next(target.clone()));
    }

    let Some(edge) = select_edge(&node.id, outcome, &state.context, graph) else {
      if outcome.is_success() {
        return Ok(match check_goal_gates(graph, &state.node_outcomes) {
          GateCheck::Passed => Flow::Finish(Finish::Success),
          GateCheck::Redirect { gate, target } => {
            warn!(gate = %gate, target = %target, "goal gate unsatisfied, redirecting");
            Flow::Next(target)
          }
          GateCheck::Unsatisfied { gate } => {
            Flow::Finish(Finish::Fail(format!("goal gate '{}' unsatisfied", gate)))
          }
        });
      }
      if let Some(target) = node.retry_target().filter(|t| graph.node(t).is_some()) {
        info!(node = %node.id, target = %target, "no outgoing edge, redirecting to retry target");
        return Ok(Flow::Next(target));
      }
      let mut reason = format!("Stage '{}' failed with no outgoing fail edge", node.id);
      if let Some(cause) = &outcome.failure_reason {
        reason.push_str(": ");
        reason.push_str(cause);
      }
      return Ok(Flow::Finish(Finish::Fail(reason)));
    };

    let target = edge.to_node.clone();
    if edge.loop_restart() {
      let n = state.restart(graph);
      info!(restart_count = n, target = %target, logs_root = %state.logs_root.display(), "loop restart");
      self.emit(
        PipelineEvent::new(EventKind::PipelineRestarted, &state.run_id)
          .with("restartCount", n)
          .with("targetNode", target.clone())
          .with("logsRoot", state.logs_root.display().to_string()),
      );
      return Ok(Flow::Next(target));
    }

    match edge.fidelity() {
      Some(mode) => state.context.set(FIDELITY_KEY, mode),
      None => {
        state.context.remove(FIDELITY_KEY);
      }
    }
    debug!(from = %node.id, to = %target, "advancing");
    Ok(Flow::Next(target))
  }

  fn finish(&self, state: RunState, finish: Finish, last: Option<NodeOutcome>) -> PipelineResult {
    let (status, failure_reason, last_outcome) = match finish {
      Finish::Success => (PipelineStatus::Success, None, last),
      Finish::Fail(reason) => (PipelineStatus::Fail, Some(reason), last),
      Finish::Cancelled => {
        let reason = "Pipeline cancelled".to_string();
        let outcome = NodeOutcome::fail(reason.clone());
        (PipelineStatus::Cancelled, Some(reason), Some(outcome))
      }
    };
    let completed_nodes = state.completed_nodes();
    match &failure_reason {
      None => {
        info!(run_id = %state.run_id, completed = ?completed_nodes, "pipeline completed");
        self.emit(
          PipelineEvent::new(EventKind::PipelineCompleted, &state.run_id)
            .with("status", status.as_str())
            .with("completedNodes", completed_nodes.clone()),
        );
      }
      Some(reason) => {
        error!(run_id = %state.run_id, status = %status, reason = %reason, "pipeline failed");
        self.emit(
          PipelineEvent::new(EventKind::PipelineFailed, &state.run_id)
            .with("status", status.as_str())
            .with("reason", reason.clone()),
        );
      }
    }
    PipelineResult {
      status,
      failure_reason,
      last_outcome,
      completed_nodes,
      completed_log: state.completed_log,
      node_retries: state.node_retries,
      context: state.context,
      restart_count: state.restart_count,
      run_id: state.run_id,
      logs_root: state.logs_root,
    }
  }
}

/// Merges an outcome into the context: its updates, then `outcome` and `preferred_label`.
#[instrument(level = "trace", skip(context, outcome))]
pub(crate) fn apply_outcome(context: &mut RunContext, outcome: &NodeOutcome) {
  context.apply_updates(&outcome.context_updates);
  context.set("outcome", outcome.status.as_str());
  if let Some(label) = &outcome.preferred_label {
    context.set("preferred_label", label.clone());
  }
}
