//! Creates independent runners for nested pipelines.

use std::path::Path;
use std::sync::Weak;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::HandlerRegistry;
use crate::error::{AttractorError, Result};
use crate::runner::{PipelineRunner, RunnerConfig};
use crate::types::AttractorGraph;

/// Builds a fresh runner for a child graph writing under `logs_root`.
pub trait PipelineRunnerFactory: Send + Sync {
  fn create_runner(&self, graph: &AttractorGraph, logs_root: &Path) -> Result<PipelineRunner>;
}

/// Child runners share the registry they were created from. Each gets its own
/// run id and a child of the parent cancellation token.
pub struct RegistryRunnerFactory {
  registry: Weak<HandlerRegistry>,
  cancel: CancellationToken,
}

impl RegistryRunnerFactory {
  pub fn new(registry: Weak<HandlerRegistry>, cancel: CancellationToken) -> Self {
    Self { registry, cancel }
  }
}

impl PipelineRunnerFactory for RegistryRunnerFactory {
  fn create_runner(&self, graph: &AttractorGraph, logs_root: &Path) -> Result<PipelineRunner> {
    let registry = self
      .registry
      .upgrade()
      .ok_or_else(|| AttractorError::Handler("handler registry no longer available".to_string()))?;
    debug!(graph = %graph.name, logs_root = %logs_root.display(), "creating child runner");
    let config = RunnerConfig::new()
      .with_logs_root(logs_root)
      .with_cancel(self.cancel.child_token());
    Ok(PipelineRunner::with_config(registry, config))
  }
}
