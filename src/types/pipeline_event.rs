//! Lifecycle events emitted by the pipeline runner.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event kinds emitted during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
  PipelineStarted,
  StageStarted,
  StageCompleted,
  StageFailed,
  PipelineCompleted,
  PipelineFailed,
  PipelineRestarted,
  CheckpointSaved,
}

impl EventKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      EventKind::PipelineStarted => "pipeline_started",
      EventKind::StageStarted => "stage_started",
      EventKind::StageCompleted => "stage_completed",
      EventKind::StageFailed => "stage_failed",
      EventKind::PipelineCompleted => "pipeline_completed",
      EventKind::PipelineFailed => "pipeline_failed",
      EventKind::PipelineRestarted => "pipeline_restarted",
      EventKind::CheckpointSaved => "checkpoint_saved",
    }
  }
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One emitted event: kind, timestamp and a free-form data map
/// (`nodeId`, `status`, `reason`, `restartCount`, `targetNode`, `logsRoot`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
  pub kind: EventKind,
  pub pipeline_id: String,
  pub timestamp: String,
  pub data: Map<String, Value>,
}

impl PipelineEvent {
  pub fn new(kind: EventKind, pipeline_id: impl Into<String>) -> Self {
    Self {
      kind,
      pipeline_id: pipeline_id.into(),
      timestamp: chrono::Utc::now().to_rfc3339(),
      data: Map::new(),
    }
  }

  pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
    self.data.insert(key.to_string(), value.into());
    self
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.data.get(key)
  }

  /// String field from `data`.
  pub fn get_str(&self, key: &str) -> Option<&str> {
    self.data.get(key).and_then(Value::as_str)
  }
}
