//! Tests for `AttractorEdge`.

use super::AttractorEdge;

#[test]
fn construct_edge() {
  let e = AttractorEdge::new("a", "b");
  assert_eq!(e.from_node, "a");
  assert_eq!(e.to_node, "b");
  assert!(e.label().is_none());
  assert!(e.condition().is_none());
  assert_eq!(e.weight(), 0);
  assert!(!e.loop_restart());
  assert!(e.fidelity().is_none());
}

#[test]
fn edge_with_attrs() {
  let e = AttractorEdge::new("x", "y")
    .with_attr("label", "yes")
    .with_attr("condition", "outcome=success")
    .with_attr("weight", 5)
    .with_attr("fidelity", "full")
    .with_attr("loop_restart", true);
  assert_eq!(e.label().as_deref(), Some("yes"));
  assert_eq!(e.condition().as_deref(), Some("outcome=success"));
  assert_eq!(e.weight(), 5);
  assert_eq!(e.fidelity().as_deref(), Some("full"));
  assert!(e.loop_restart());
}

#[test]
fn blank_condition_is_absent() {
  let e = AttractorEdge::new("a", "b").with_attr("condition", "   ");
  assert!(e.condition().is_none());
}

#[test]
fn string_weight_and_flag_are_parsed() {
  let e = AttractorEdge::new("a", "b")
    .with_attr("weight", "-3")
    .with_attr("loop_restart", "true");
  assert_eq!(e.weight(), -3);
  assert!(e.loop_restart());
}
