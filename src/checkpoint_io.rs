//! Checkpoint save/load under a logs root (JSON).

use std::path::Path;

use tracing::instrument;

use crate::error::{AttractorError, Result};
use crate::types::{CHECKPOINT_VERSION, Checkpoint};

/// Default filename for checkpoint under a logs root.
pub const CHECKPOINT_FILENAME: &str = "checkpoint.json";

fn io_err(path: &Path, source: std::io::Error) -> AttractorError {
  AttractorError::CheckpointIo {
    path: path.display().to_string(),
    source,
  }
}

/// Saves a checkpoint to `path` as pretty JSON, creating parent directories.
///
/// Writes to a sibling temp file, then renames it into place.
#[instrument(level = "trace", skip(path, cp))]
pub fn save_checkpoint(path: &Path, cp: &Checkpoint) -> Result<()> {
  let json = serde_json::to_string_pretty(cp).map_err(AttractorError::CheckpointEncode)?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
  }
  let tmp = path.with_extension("json.tmp");
  std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
  std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))
}

/// Loads a checkpoint from `path`. Fails on a missing file, invalid JSON,
/// missing fields or an unsupported version.
#[instrument(level = "trace", skip(path))]
pub fn load_checkpoint(path: &Path) -> Result<Checkpoint> {
  let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
  let cp: Checkpoint = serde_json::from_slice(&bytes)?;
  if cp.version != CHECKPOINT_VERSION {
    return Err(AttractorError::CheckpointVersion {
      found: cp.version,
      expected: CHECKPOINT_VERSION,
    });
  }
  Ok(cp)
}
