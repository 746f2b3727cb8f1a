//! Codergen stage: expands the node prompt and hands it to a [Backend].

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument};

use super::{Handler, HandlerOutput};
use crate::error::{AttractorError, Result};
use crate::types::{AttrValue, AttractorGraph, AttractorNode, NodeOutcome, OutcomeStatus, RunContext};

/// Per-call options passed to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendOptions {
  /// `<logs_root>/<node_id>`; prompt and response files live here.
  pub stage_dir: PathBuf,
  /// Value of `_fidelity.mode` when the stage started.
  pub fidelity: Option<String>,
  pub goal: String,
}

/// Produces the response for a codergen stage (an LLM, an agent CLI, a stub).
#[async_trait]
pub trait Backend: Send + Sync {
  async fn run(
    &self,
    node: &AttractorNode,
    prompt: &str,
    context: &RunContext,
    options: &BackendOptions,
  ) -> Result<HandlerOutput>;
}

/// Prompt text for a node: `prompt`, else `label`, with `$goal` expanded.
#[instrument(level = "trace", skip(node, graph))]
pub(crate) fn expand_prompt(node: &AttractorNode, graph: &AttractorGraph) -> String {
  node
    .prompt()
    .unwrap_or_else(|| node.label())
    .replace("$goal", &graph.goal())
}

fn stage_io_err(path: &Path, e: std::io::Error) -> AttractorError {
  AttractorError::Handler(format!("cannot write {}: {}", path.display(), e))
}

pub struct CodergenHandler {
  backend: Option<Arc<dyn Backend>>,
}

impl CodergenHandler {
  pub fn new(backend: Option<Arc<dyn Backend>>) -> Self {
    Self { backend }
  }
}

#[async_trait]
impl Handler for CodergenHandler {
  async fn execute(
    &self,
    node: &AttractorNode,
    context: &RunContext,
    graph: &AttractorGraph,
    logs_root: &Path,
  ) -> Result<HandlerOutput> {
    let prompt = expand_prompt(node, graph);
    let stage_dir = logs_root.join(&node.id);
    tokio::fs::create_dir_all(&stage_dir)
      .await
      .map_err(|e| stage_io_err(&stage_dir, e))?;
    let prompt_path = stage_dir.join("prompt.md");
    tokio::fs::write(&prompt_path, &prompt)
      .await
      .map_err(|e| stage_io_err(&prompt_path, e))?;

    let outcome = match &self.backend {
      Some(backend) => {
        let options = BackendOptions {
          stage_dir: stage_dir.clone(),
          fidelity: context.get("_fidelity.mode").map(str::to_string),
          goal: graph.goal(),
        };
        backend.run(node, &prompt, context, &options).await?.into_outcome()
      }
      None => {
        let text = format!("[Simulated] Response for stage: {}", node.id);
        NodeOutcome::success(text.clone()).with_update("last_response", text)
      }
    };

    if let Some(notes) = &outcome.notes {
      let response_path = stage_dir.join("response.md");
      tokio::fs::write(&response_path, notes)
        .await
        .map_err(|e| stage_io_err(&response_path, e))?;
    }
    Ok(outcome.with_update("last_stage", node.id.clone()).into())
  }
}

/// Outcome file an agent may leave at `<stage_dir>/outcome.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StageReport {
  outcome: Option<String>,
  notes: Option<String>,
  failure_reason: Option<String>,
  preferred_label: Option<String>,
  suggested_next_ids: Vec<String>,
  context_updates: HashMap<String, AttrValue>,
}

impl StageReport {
  fn into_outcome(self, stdout: String) -> NodeOutcome {
    // Anything other than a recognised fail/retry spelling counts as success.
    let status = self
      .outcome
      .as_deref()
      .and_then(|s| s.parse().ok())
      .unwrap_or(OutcomeStatus::Success);
    let mut outcome = match status {
      OutcomeStatus::Success => {
        let notes = self.notes.unwrap_or_else(|| stdout.clone());
        NodeOutcome::success(notes).with_update("last_response", stdout)
      }
      OutcomeStatus::Fail => NodeOutcome::fail(
        self
          .failure_reason
          .unwrap_or_else(|| "agent reported outcome=fail in outcome.json".to_string()),
      ),
      OutcomeStatus::Retry => NodeOutcome::retry(
        self
          .failure_reason
          .unwrap_or_else(|| "agent requested retry".to_string()),
      ),
    };
    outcome.context_updates.extend(self.context_updates);
    outcome.preferred_label = self.preferred_label;
    outcome.suggested_next_ids = self.suggested_next_ids;
    outcome
  }
}

fn read_outcome_file(stage_dir: &Path) -> Option<StageReport> {
  let s = std::fs::read_to_string(stage_dir.join("outcome.json")).ok()?;
  match serde_json::from_str(&s) {
    Ok(report) => Some(report),
    Err(e) => {
      tracing::warn!(stage_dir = %stage_dir.display(), error = %e, "ignoring malformed outcome.json");
      None
    }
  }
}

/// Runs an external agent command with the prompt on stdin.
///
/// The agent sees `ATTRACTOR_STAGE_DIR` in its environment and may write
/// `outcome.json` there; otherwise its exit code decides the status and its
/// stdout becomes the response.
#[derive(Debug, Clone)]
pub struct CommandBackend {
  command: String,
}

impl CommandBackend {
  pub fn new(command: impl Into<String>) -> Self {
    Self {
      command: command.into(),
    }
  }
}

#[async_trait]
impl Backend for CommandBackend {
  async fn run(
    &self,
    node: &AttractorNode,
    prompt: &str,
    _context: &RunContext,
    options: &BackendOptions,
  ) -> Result<HandlerOutput> {
    info!(node = %node.id, command = %self.command, "running agent");
    let command = self.command.clone();
    let prompt = prompt.to_string();
    let stage_dir = options.stage_dir.clone();
    tokio::task::spawn_blocking(move || run_agent(&command, &prompt, &stage_dir))
      .await
      .map_err(|e| AttractorError::Backend(format!("agent task: {}", e)))?
  }
}

#[instrument(level = "trace", skip(prompt))]
fn run_agent(command: &str, prompt: &str, stage_dir: &Path) -> Result<HandlerOutput> {
  let parts: Vec<&str> = command.split_whitespace().collect();
  let Some((bin, args)) = parts.split_first() else {
    return Err(AttractorError::Backend("agent command is empty".to_string()));
  };
  let mut child = Command::new(bin)
    .args(args)
    .env("ATTRACTOR_STAGE_DIR", stage_dir)
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::inherit())
    .spawn()
    .map_err(|e| AttractorError::Backend(format!("agent spawn: {}", e)))?;
  if let Some(mut stdin) = child.stdin.take() {
    let _ = stdin.write_all(prompt.as_bytes());
    let _ = stdin.write_all(b"\n");
  }
  let output = child
    .wait_with_output()
    .map_err(|e| AttractorError::Backend(format!("agent wait: {}", e)))?;

  if !output.status.success() {
    let msg = output
      .status
      .code()
      .map(|c| format!("agent exit {}", c))
      .unwrap_or_else(|| "agent signal".to_string());
    return Ok(NodeOutcome::fail(msg).into());
  }
  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
  Ok(match read_outcome_file(stage_dir) {
    Some(report) => report.into_outcome(stdout).into(),
    None => HandlerOutput::Text(stdout),
  })
}
