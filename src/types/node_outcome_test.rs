//! Tests for `NodeOutcome`.

use super::{AttrValue, NodeOutcome, OutcomeStatus};

#[test]
fn success_creates_success_outcome() {
  let o = NodeOutcome::success("done");
  assert_eq!(o.status, OutcomeStatus::Success);
  assert_eq!(o.notes.as_deref(), Some("done"));
  assert!(o.failure_reason.is_none());
  assert!(o.context_updates.is_empty());
  assert!(o.preferred_label.is_none());
  assert!(o.suggested_next_ids.is_empty());
  assert!(o.jump_to.is_none());
}

#[test]
fn fail_creates_fail_outcome() {
  let o = NodeOutcome::fail("error");
  assert_eq!(o.status, OutcomeStatus::Fail);
  assert!(o.notes.is_none());
  assert_eq!(o.failure_reason.as_deref(), Some("error"));
}

#[test]
fn retry_carries_reason() {
  let o = NodeOutcome::retry("flaky");
  assert_eq!(o.status, OutcomeStatus::Retry);
  assert_eq!(o.failure_reason.as_deref(), Some("flaky"));
}

#[test]
fn builders_set_routing_hints() {
  let o = NodeOutcome::success("ok")
    .with_update("count", 3)
    .with_update("ready", true)
    .with_preferred_label("[A] Approve")
    .with_suggested_next(vec!["deploy".to_string()]);
  assert_eq!(o.context_updates.get("count"), Some(&AttrValue::Integer(3)));
  assert_eq!(o.context_updates.get("ready"), Some(&AttrValue::Boolean(true)));
  assert_eq!(o.preferred_label.as_deref(), Some("[A] Approve"));
  assert_eq!(o.suggested_next_ids, vec!["deploy"]);
}

#[test]
fn json_omits_empty_optionals() {
  let json = serde_json::to_value(NodeOutcome::success("x")).unwrap();
  assert_eq!(json["status"], "success");
  assert!(json.get("failure_reason").is_none());
  assert!(json.get("jump_to").is_none());
}
