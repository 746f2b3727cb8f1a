//! Tests for `AttractorNode`.

use super::attractor_node::{
  AttractorNode, handler_type_for_shape, id_is_exit, id_is_start, shape_is_exit, shape_is_start,
};

fn node(id: &str, shape: &str) -> AttractorNode {
  AttractorNode::new(id).with_attr("shape", shape)
}

#[test]
fn shape_is_start_and_id_helpers() {
  assert!(shape_is_start("Mdiamond"));
  assert!(shape_is_start("mdiamond"));
  assert!(!shape_is_start("box"));
  assert!(id_is_start("start"));
  assert!(id_is_start("START"));
  assert!(shape_is_exit("Msquare"));
  assert!(id_is_exit("exit"));
}

#[test]
fn is_start_by_shape_or_id() {
  assert!(node("foo", "Mdiamond").is_start());
  assert!(node("start", "ellipse").is_start());
  assert!(!node("foo", "ellipse").is_start());
}

#[test]
fn is_exit_by_shape_or_id() {
  assert!(node("foo", "Msquare").is_exit());
  assert!(node("EXIT", "ellipse").is_exit());
  assert!(!node("foo", "ellipse").is_exit());
}

#[test]
fn is_terminal_when_exit() {
  assert!(node("exit", "ellipse").is_terminal());
  assert!(!node("foo", "ellipse").is_terminal());
}

#[test]
fn handler_type_prefers_explicit_type() {
  let n = node("p", "box").with_attr("type", "sub_pipeline");
  assert_eq!(n.handler_type(), "sub_pipeline");
}

#[test]
fn handler_type_from_shape() {
  assert_eq!(node("a", "component").handler_type(), "parallel");
  assert_eq!(node("a", "tripleoctagon").handler_type(), "parallel.fan_in");
  assert_eq!(node("a", "house").handler_type(), "stack.manager_loop");
  assert_eq!(node("a", "hexagon").handler_type(), "wait.human");
  assert_eq!(AttractorNode::new("a").handler_type(), "codergen");
  assert_eq!(handler_type_for_shape("oval"), "codergen");
}

#[test]
fn typed_attribute_accessors() {
  let n = AttractorNode::new("validate")
    .with_attr("max_retries", 3)
    .with_attr("retry_target", "implement")
    .with_attr("goal_gate", "true");
  assert_eq!(n.max_retries(), Some(3));
  assert_eq!(n.retry_target().as_deref(), Some("implement"));
  assert!(n.goal_gate());
  assert_eq!(n.label(), "validate");
}

#[test]
fn negative_max_retries_clamps_to_zero() {
  let n = AttractorNode::new("a").with_attr("max_retries", -2);
  assert_eq!(n.max_retries(), Some(0));
}

#[test]
fn oversized_max_retries_saturates() {
  let n = AttractorNode::new("a").with_attr("max_retries", 4_294_967_296i64);
  assert_eq!(n.max_retries(), Some(u32::MAX));
}
