//! Mutable bookkeeping for one run: context, completion log, attempt counts.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::checkpoint_io::CHECKPOINT_FILENAME;
use crate::types::{
  AttractorGraph, CHECKPOINT_VERSION, Checkpoint, OutcomeStatus, RunContext, is_restart_marker,
  restart_marker,
};

/// Logs directory for restart epoch `n`: the base root, then `restart-<n>` below it.
pub(crate) fn restart_root(base: &Path, n: u32) -> PathBuf {
  if n == 0 {
    base.to_path_buf()
  } else {
    base.join(format!("restart-{}", n))
  }
}

#[derive(Debug, Clone)]
pub(crate) struct RunState {
  pub run_id: String,
  pub context: RunContext,
  /// Every completed node, restart markers included.
  pub completed_log: Vec<String>,
  /// Latest status per node of the current segment.
  pub node_outcomes: HashMap<String, OutcomeStatus>,
  /// Total attempts per node across the whole run.
  pub node_retries: BTreeMap<String, u32>,
  pub logs: Vec<String>,
  pub restart_count: u32,
  pub base_logs_root: PathBuf,
  pub logs_root: PathBuf,
  /// Nodes restored from a checkpoint; reaching one reuses its status instead of executing it.
  pub resumed: HashMap<String, OutcomeStatus>,
  /// Set after resume until the next stage actually executes.
  pub resume_fidelity_pending: bool,
}

impl RunState {
  pub fn fresh(graph: &AttractorGraph, run_id: &str, base_logs_root: &Path) -> Self {
    let mut context = RunContext::for_graph(graph);
    context.set("run_id", run_id);
    Self {
      run_id: run_id.to_string(),
      context,
      completed_log: Vec::new(),
      node_outcomes: HashMap::new(),
      node_retries: BTreeMap::new(),
      logs: Vec::new(),
      restart_count: 0,
      base_logs_root: base_logs_root.to_path_buf(),
      logs_root: base_logs_root.to_path_buf(),
      resumed: HashMap::new(),
      resume_fidelity_pending: false,
    }
  }

  /// Rebuilds state from a checkpoint. The checkpointed context is restored,
  /// graph attributes are mirrored again and `run_id` is the checkpoint's pipeline id.
  pub fn from_checkpoint(cp: &Checkpoint, graph: &AttractorGraph, base_logs_root: &Path) -> Self {
    let mut context = RunContext::from_values(cp.context_values.clone().into_iter().collect());
    context.mirror_graph_attributes(graph);
    context.set("run_id", cp.pipeline_id.clone());

    let mut node_outcomes = HashMap::new();
    for (id, raw) in &cp.node_outcomes {
      match raw.parse::<OutcomeStatus>() {
        Ok(status) => {
          node_outcomes.insert(id.clone(), status);
        }
        Err(e) => warn!(node = %id, error = %e, "ignoring checkpointed outcome"),
      }
    }
    let resumed = cp
      .current_segment()
      .iter()
      .filter(|id| **id != cp.current_node)
      .map(|id| {
        let status = node_outcomes
          .get(id)
          .copied()
          .unwrap_or(OutcomeStatus::Success);
        (id.clone(), status)
      })
      .collect();

    Self {
      run_id: cp.pipeline_id.clone(),
      context,
      completed_log: cp.completed_nodes.clone(),
      node_outcomes,
      node_retries: cp.node_retries.clone(),
      logs: cp.logs.clone(),
      restart_count: cp.restart_count,
      base_logs_root: base_logs_root.to_path_buf(),
      logs_root: restart_root(base_logs_root, cp.restart_count),
      resumed,
      resume_fidelity_pending: true,
    }
  }

  /// Completed node ids after the last restart marker.
  pub fn completed_nodes(&self) -> Vec<String> {
    let start = self
      .completed_log
      .iter()
      .rposition(|n| is_restart_marker(n))
      .map(|i| i + 1)
      .unwrap_or(0);
    self.completed_log[start..].to_vec()
  }

  /// Counts one attempt of `node_id`; returns the run-wide total.
  pub fn count_attempt(&mut self, node_id: &str) -> u32 {
    let n = self.node_retries.entry(node_id.to_string()).or_insert(0);
    *n += 1;
    *n
  }

  pub fn record(&mut self, node_id: &str, status: OutcomeStatus) {
    self.completed_log.push(node_id.to_string());
    self.node_outcomes.insert(node_id.to_string(), status);
    self.logs.push(format!("{} completed: {}", node_id, status));
  }

  /// Hard reset for a `loop_restart` edge. Returns the new restart count.
  pub fn restart(&mut self, graph: &AttractorGraph) -> u32 {
    self.restart_count += 1;
    let mut context = RunContext::for_graph(graph);
    context.set("run_id", self.run_id.clone());
    self.context = context;
    self.node_outcomes.clear();
    self.resumed.clear();
    self.completed_log.push(restart_marker(self.restart_count));
    self.logs_root = restart_root(&self.base_logs_root, self.restart_count);
    self
      .logs
      .push(format!("restart {} at {}", self.restart_count, self.logs_root.display()));
    self.restart_count
  }

  pub fn checkpoint_path(&self) -> PathBuf {
    self.logs_root.join(CHECKPOINT_FILENAME)
  }

  pub fn checkpoint(&self, current_node: &str) -> Checkpoint {
    Checkpoint {
      version: CHECKPOINT_VERSION,
      pipeline_id: self.run_id.clone(),
      timestamp: chrono::Utc::now().to_rfc3339(),
      current_node: current_node.to_string(),
      completed_nodes: self.completed_log.clone(),
      node_retries: self.node_retries.clone(),
      node_outcomes: self
        .node_outcomes
        .iter()
        .map(|(k, v)| (k.clone(), v.as_str().to_string()))
        .collect(),
      context_values: self.context.snapshot(),
      logs: self.logs.clone(),
      restart_count: self.restart_count,
    }
  }
}
