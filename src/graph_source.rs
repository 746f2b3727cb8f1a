//! Graph sources: how nested stages obtain their child graphs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::dot_parser::parse_dot;
use crate::error::{AttractorError, Result};
use crate::types::AttractorGraph;

/// Resolves a graph reference (a path, a name) to a parsed graph.
pub trait GraphSource: Send + Sync {
  fn load(&self, reference: &str) -> Result<AttractorGraph>;
}

/// Reads DOT files from disk. Relative references resolve against `base_dir` when set.
#[derive(Debug, Clone, Default)]
pub struct DotFileSource {
  base_dir: Option<PathBuf>,
}

impl DotFileSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
    Self {
      base_dir: Some(base_dir.into()),
    }
  }

  /// Path a reference would be read from.
  pub fn resolve(&self, reference: &str) -> PathBuf {
    let p = Path::new(reference);
    match &self.base_dir {
      Some(base) if p.is_relative() => base.join(p),
      _ => p.to_path_buf(),
    }
  }
}

impl GraphSource for DotFileSource {
  #[instrument(level = "trace", skip(self))]
  fn load(&self, reference: &str) -> Result<AttractorGraph> {
    let path = self.resolve(reference);
    let source = std::fs::read_to_string(&path)
      .map_err(|e| AttractorError::GraphSource(format!("cannot read {}: {}", path.display(), e)))?;
    parse_dot(&source)
  }
}

/// Serves pre-built graphs by name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraphSource {
  graphs: HashMap<String, AttractorGraph>,
}

impl InMemoryGraphSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_graph(mut self, reference: impl Into<String>, graph: AttractorGraph) -> Self {
    self.graphs.insert(reference.into(), graph);
    self
  }

  pub fn insert(&mut self, reference: impl Into<String>, graph: AttractorGraph) {
    self.graphs.insert(reference.into(), graph);
  }
}

impl GraphSource for InMemoryGraphSource {
  fn load(&self, reference: &str) -> Result<AttractorGraph> {
    self
      .graphs
      .get(reference)
      .cloned()
      .ok_or_else(|| AttractorError::GraphSource(format!("unknown graph '{}'", reference)))
  }
}
