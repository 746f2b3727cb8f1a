//! Tests for checkpoint save/load.

use std::collections::BTreeMap;

use crate::checkpoint_io::{CHECKPOINT_FILENAME, load_checkpoint, save_checkpoint};
use crate::error::AttractorError;
use crate::types::{CHECKPOINT_VERSION, Checkpoint};

fn checkpoint() -> Checkpoint {
  let mut ctx = BTreeMap::new();
  ctx.insert("k".to_string(), "v".to_string());
  Checkpoint {
    version: CHECKPOINT_VERSION,
    pipeline_id: "run-1".to_string(),
    timestamp: "2026-02-14T10:00:00Z".to_string(),
    current_node: "node1".to_string(),
    completed_nodes: vec!["start".to_string(), "node1".to_string()],
    node_retries: BTreeMap::from([("node1".to_string(), 1)]),
    node_outcomes: BTreeMap::from([("node1".to_string(), "success".to_string())]),
    context_values: ctx,
    logs: vec!["node1 completed: success".to_string()],
    restart_count: 0,
  }
}

#[test]
fn roundtrip_save_load() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("nested").join(CHECKPOINT_FILENAME);
  let cp = checkpoint();
  save_checkpoint(&path, &cp).unwrap();
  assert!(path.exists());
  assert!(!path.with_extension("json.tmp").exists());
  let loaded = load_checkpoint(&path).unwrap();
  assert_eq!(loaded, cp);
}

#[test]
fn save_overwrites_previous() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join(CHECKPOINT_FILENAME);
  let mut cp = checkpoint();
  save_checkpoint(&path, &cp).unwrap();
  cp.current_node = "node2".to_string();
  save_checkpoint(&path, &cp).unwrap();
  assert_eq!(load_checkpoint(&path).unwrap().current_node, "node2");
}

#[test]
fn load_missing_file_returns_error() {
  let dir = tempfile::tempdir().unwrap();
  let r = load_checkpoint(&dir.path().join("nonexistent.json"));
  assert!(matches!(r, Err(AttractorError::CheckpointIo { .. })));
}

#[test]
fn load_rejects_missing_fields() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join(CHECKPOINT_FILENAME);
  std::fs::write(&path, r#"{"version":1,"pipeline_id":"x"}"#).unwrap();
  assert!(matches!(
    load_checkpoint(&path),
    Err(AttractorError::CheckpointDecode(_))
  ));
}

#[test]
fn load_rejects_unknown_version() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join(CHECKPOINT_FILENAME);
  let mut cp = checkpoint();
  cp.version = 99;
  std::fs::write(&path, serde_json::to_string(&cp).unwrap()).unwrap();
  assert!(matches!(
    load_checkpoint(&path),
    Err(AttractorError::CheckpointVersion { found: 99, .. })
  ));
}

#[test]
fn encode_errors_are_not_reported_as_decode_errors() {
  let bad = BTreeMap::from([((1u8, 2u8), "v")]);
  let source = serde_json::to_string(&bad).unwrap_err();
  let e = AttractorError::CheckpointEncode(source);
  assert!(e.to_string().starts_with("checkpoint encode error:"));
  assert!(std::error::Error::source(&e).is_some());
}
