//! Tests for `AttractorGraph`.

use super::{AttractorEdge, AttractorGraph, AttractorNode};

fn node(id: &str, shape: &str) -> AttractorNode {
  AttractorNode::new(id).with_attr("shape", shape)
}

#[test]
fn find_start_by_shape() {
  let g = AttractorGraph::new("g")
    .with_node(node("a", "ellipse"))
    .with_node(node("begin", "Mdiamond"))
    .with_node(node("b", "ellipse"));
  assert_eq!(g.find_start().unwrap().id, "begin");
}

#[test]
fn find_start_none() {
  let g = AttractorGraph::new("g")
    .with_node(node("a", "ellipse"))
    .with_node(node("b", "ellipse"));
  assert!(g.find_start().is_none());
}

#[test]
fn find_exit_by_shape() {
  let g = AttractorGraph::new("g")
    .with_node(node("a", "ellipse"))
    .with_node(node("done", "Msquare"));
  assert_eq!(g.find_exit().unwrap().id, "done");
}

#[test]
fn outgoing_edges_keep_declaration_order() {
  let g = AttractorGraph::new("g")
    .with_node(node("a", "box"))
    .with_node(node("b", "box"))
    .with_node(node("c", "box"))
    .with_edge(AttractorEdge::new("a", "c"))
    .with_edge(AttractorEdge::new("b", "c"))
    .with_edge(AttractorEdge::new("a", "b"));
  let out: Vec<_> = g.outgoing_edges("a").iter().map(|e| e.to_node.clone()).collect();
  assert_eq!(out, vec!["c", "b"]);
  assert!(g.outgoing_edges("c").is_empty());
}

#[test]
fn goal_and_default_max_retry() {
  let g = AttractorGraph::new("g")
    .with_attr("goal", "ship it")
    .with_attr("default_max_retry", 2);
  assert_eq!(g.goal(), "ship it");
  assert_eq!(g.default_max_retry(), Some(2));
  assert_eq!(g.max_retries_for(&AttractorNode::new("x")), 2);
  assert_eq!(
    g.max_retries_for(&AttractorNode::new("y").with_attr("max_retries", 5)),
    5
  );
  assert_eq!(AttractorGraph::new("h").max_retries_for(&AttractorNode::new("x")), 0);
}

#[test]
fn oversized_default_max_retry_saturates() {
  let g = AttractorGraph::new("g").with_attr("default_max_retry", 4_294_967_296i64);
  assert_eq!(g.default_max_retry(), Some(u32::MAX));
}
