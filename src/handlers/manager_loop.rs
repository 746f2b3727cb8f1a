//! Manager loop (house): supervises a child pipeline over repeated poll cycles.
//!
//! Node attributes:
//! - `manager.poll_interval`: `500ms`, `2s`, `1m`, `1h` (bare numbers are seconds; default `45s`)
//! - `manager.max_cycles`: default 1000
//! - `manager.actions`: comma list of `observe`, `wait` (default both)
//! - `manager.stop_condition`: condition over the child's checkpointed context
//! - `manager.context_keys`: comma list of child keys to ingest
//!
//! The child graph comes from the graph attribute `stack.child_dotfile`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::sub_pipeline::child_outcome;
use super::{Handler, HandlerOutput, PipelineRunnerFactory};
use crate::checkpoint_io::{CHECKPOINT_FILENAME, load_checkpoint};
use crate::condition::evaluate_condition;
use crate::error::{AttractorError, Result};
use crate::graph_source::GraphSource;
use crate::runner::{PipelineResult, PipelineStatus};
use crate::types::{AttrValue, AttractorGraph, AttractorNode, NodeOutcome, RunContext};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(45);
const DEFAULT_MAX_CYCLES: u32 = 1000;

/// Parses `250ms`, `2s`, `5m`, `1h` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
  let s = raw.trim();
  let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
  let (num, unit) = s.split_at(split);
  let n: u64 = num.parse().ok()?;
  match unit.trim() {
    "ms" => Some(Duration::from_millis(n)),
    "" | "s" => Some(Duration::from_secs(n)),
    "m" => Some(Duration::from_secs(n.checked_mul(60)?)),
    "h" => Some(Duration::from_secs(n.checked_mul(3600)?)),
    _ => None,
  }
}

fn csv_list(raw: Option<String>) -> Option<Vec<String>> {
  raw.map(|s| {
    s.split(',')
      .map(|p| p.trim().to_string())
      .filter(|p| !p.is_empty())
      .collect()
  })
}

/// Settings read from the manager node.
#[derive(Debug, Clone, PartialEq)]
struct ManagerSettings {
  poll_interval: Duration,
  max_cycles: u32,
  observe: bool,
  wait: bool,
  stop_condition: Option<String>,
  context_keys: Option<Vec<String>>,
}

impl ManagerSettings {
  fn from_node(node: &AttractorNode) -> Self {
    let poll_interval = match node.attr_string("manager.poll_interval") {
      Some(raw) => parse_duration(&raw).unwrap_or_else(|| {
        warn!(node = %node.id, value = %raw, "invalid manager.poll_interval, using default");
        DEFAULT_POLL_INTERVAL
      }),
      None => DEFAULT_POLL_INTERVAL,
    };
    let max_cycles = node
      .attr("manager.max_cycles")
      .and_then(AttrValue::as_int)
      .filter(|n| *n > 0)
      .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
      .unwrap_or(DEFAULT_MAX_CYCLES);
    let actions = csv_list(node.attr_string("manager.actions"))
      .unwrap_or_else(|| vec!["observe".to_string(), "wait".to_string()]);
    Self {
      poll_interval,
      max_cycles,
      observe: actions.iter().any(|a| a == "observe"),
      wait: actions.iter().any(|a| a == "wait"),
      stop_condition: node
        .attr_string("manager.stop_condition")
        .filter(|c| !c.trim().is_empty()),
      context_keys: csv_list(node.attr_string("manager.context_keys")),
    }
  }
}

/// Child context entries to copy into the parent as `stack.child.context.<key>`.
fn ingest_keys(
  child: &BTreeMap<String, String>,
  keys: Option<&[String]>,
) -> Vec<(String, String)> {
  match keys {
    Some(keys) => keys
      .iter()
      .filter_map(|k| child.get(k).map(|v| (k.clone(), v.clone())))
      .collect(),
    None => child
      .iter()
      .filter(|(k, _)| !k.starts_with("graph.") && !k.starts_with("internal."))
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect(),
  }
}

fn with_child_state(
  mut outcome: NodeOutcome,
  status: &str,
  completed: &[String],
  context: &BTreeMap<String, String>,
  keys: Option<&[String]>,
) -> NodeOutcome {
  outcome = outcome
    .with_update("stack.child.status", status)
    .with_update(
      "stack.child.completedNodes",
      serde_json::Value::from(completed.to_vec()).to_string(),
    );
  for (k, v) in ingest_keys(context, keys) {
    outcome = outcome.with_update(format!("stack.child.context.{}", k), v);
  }
  outcome
}

/// Final status and completed nodes of a child that was asked to stop.
fn settle_child(
  joined: std::result::Result<Result<PipelineResult>, tokio::task::JoinError>,
) -> (&'static str, Vec<String>) {
  match joined {
    Ok(Ok(result)) => (result.status.as_str(), result.completed_nodes),
    _ => (PipelineStatus::Cancelled.as_str(), Vec::new()),
  }
}

pub struct ManagerLoopHandler {
  graphs: Arc<dyn GraphSource>,
  factory: Arc<dyn PipelineRunnerFactory>,
}

impl ManagerLoopHandler {
  pub fn new(graphs: Arc<dyn GraphSource>, factory: Arc<dyn PipelineRunnerFactory>) -> Self {
    Self { graphs, factory }
  }
}

#[async_trait]
impl Handler for ManagerLoopHandler {
  async fn execute(
    &self,
    node: &AttractorNode,
    _context: &RunContext,
    graph: &AttractorGraph,
    logs_root: &Path,
  ) -> Result<HandlerOutput> {
    let Some(reference) = graph.attr_string("stack.child_dotfile") else {
      return Ok(NodeOutcome::fail("stack.child_dotfile not set on graph").into());
    };
    let settings = ManagerSettings::from_node(node);
    let keys = settings.context_keys.as_deref();
    let child = self.graphs.load(&reference)?;
    let child_root = logs_root.join(&node.id);
    let checkpoint_path = child_root.join(CHECKPOINT_FILENAME);

    let runner = self.factory.create_runner(&child, &child_root)?;
    let token = runner.cancel_token();
    info!(node = %node.id, child = %reference, max_cycles = settings.max_cycles, "manager loop starting child");
    let mut handle = tokio::spawn(async move { runner.run(&child).await });

    let mut observed: BTreeMap<String, String> = BTreeMap::new();
    for cycle in 1..=settings.max_cycles {
      let finished = if settings.wait {
        tokio::select! {
          joined = &mut handle => Some(joined),
          _ = tokio::time::sleep(settings.poll_interval) => None,
        }
      } else {
        tokio::task::yield_now().await;
        if handle.is_finished() {
          Some((&mut handle).await)
        } else {
          None
        }
      };

      if let Some(joined) = finished {
        let result =
          joined.map_err(|e| AttractorError::Handler(format!("child pipeline task failed: {}", e)))??;
        info!(node = %node.id, cycle, status = %result.status, "child pipeline finished");
        let outcome = child_outcome(&format!("child pipeline '{}'", reference), &result);
        return Ok(
          with_child_state(
            outcome,
            result.status.as_str(),
            &result.completed_nodes,
            &result.context.snapshot(),
            keys,
          )
          .into(),
        );
      }

      if settings.observe && checkpoint_path.exists() {
        match load_checkpoint(&checkpoint_path) {
          Ok(cp) => {
            debug!(node = %node.id, cycle, child_node = %cp.current_node, "observed child");
            observed = cp.context_values;
          }
          Err(e) => debug!(node = %node.id, cycle, error = %e, "child checkpoint not readable yet"),
        }
      }

      if let Some(cond) = &settings.stop_condition {
        let neutral = NodeOutcome::success("");
        let child_context = RunContext::from_values(observed.clone().into_iter().collect());
        if evaluate_condition(cond, &neutral, &child_context) {
          info!(node = %node.id, cycle, "stop condition satisfied");
          token.cancel();
          let (status, completed) = settle_child((&mut handle).await);
          return Ok(
            with_child_state(
              NodeOutcome::success(format!("stop condition met after {} cycles", cycle)),
              status,
              &completed,
              &observed,
              keys,
            )
            .into(),
          );
        }
      }
    }

    warn!(node = %node.id, max_cycles = settings.max_cycles, "manager loop exhausted cycles, cancelling child");
    token.cancel();
    let (status, completed) = settle_child(handle.await);
    Ok(
      with_child_state(
        NodeOutcome::fail(format!(
          "manager loop exhausted {} cycles before child pipeline finished",
          settings.max_cycles
        )),
        status,
        &completed,
        &observed,
        keys,
      )
      .into(),
    )
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::{ManagerSettings, parse_duration};
  use crate::types::AttractorNode;

  #[test]
  fn parse_duration_units() {
    assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
    assert_eq!(parse_duration("2s"), Some(Duration::from_secs(2)));
    assert_eq!(parse_duration("3m"), Some(Duration::from_secs(180)));
    assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
    assert_eq!(parse_duration("7"), Some(Duration::from_secs(7)));
    assert_eq!(parse_duration("soon"), None);
    assert_eq!(parse_duration("5d"), None);
    assert_eq!(parse_duration("6000000000000000h"), None);
    assert_eq!(parse_duration("400000000000000000m"), None);
  }

  #[test]
  fn settings_defaults() {
    let s = ManagerSettings::from_node(&AttractorNode::new("m"));
    assert_eq!(s.poll_interval, Duration::from_secs(45));
    assert_eq!(s.max_cycles, 1000);
    assert!(s.observe && s.wait);
    assert!(s.stop_condition.is_none());
    assert!(s.context_keys.is_none());
  }

  #[test]
  fn settings_from_attributes() {
    let node = AttractorNode::new("m")
      .with_attr("manager.poll_interval", "10ms")
      .with_attr("manager.max_cycles", 3)
      .with_attr("manager.actions", "observe")
      .with_attr("manager.context_keys", "a, b");
    let s = ManagerSettings::from_node(&node);
    assert_eq!(s.poll_interval, Duration::from_millis(10));
    assert_eq!(s.max_cycles, 3);
    assert!(s.observe && !s.wait);
    assert_eq!(s.context_keys, Some(vec!["a".to_string(), "b".to_string()]));
  }

  #[test]
  fn oversized_settings_fall_back_or_saturate() {
    let node = AttractorNode::new("m")
      .with_attr("manager.poll_interval", "6000000000000000h")
      .with_attr("manager.max_cycles", 4_294_967_296i64);
    let s = ManagerSettings::from_node(&node);
    assert_eq!(s.poll_interval, Duration::from_secs(45));
    assert_eq!(s.max_cycles, u32::MAX);
  }
}
