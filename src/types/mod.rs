//! Pipeline data model: graph, context, outcome, checkpoint and event types.

mod attr_value;
mod attractor_edge;
#[cfg(test)]
mod attractor_edge_test;
mod attractor_graph;
#[cfg(test)]
mod attractor_graph_test;
mod attractor_node;
#[cfg(test)]
mod attractor_node_test;
mod checkpoint;
mod node_outcome;
#[cfg(test)]
mod node_outcome_test;
mod outcome_status;
mod pipeline_event;
mod run_context;

pub use attr_value::AttrValue;
pub use attractor_edge::AttractorEdge;
pub use attractor_graph::AttractorGraph;
pub use attractor_node::AttractorNode;
pub use checkpoint::{
  CHECKPOINT_VERSION, Checkpoint, RESTART_MARKER_PREFIX, is_restart_marker, restart_marker,
};
pub use node_outcome::NodeOutcome;
pub use outcome_status::OutcomeStatus;
pub use pipeline_event::{EventKind, PipelineEvent};
pub use run_context::RunContext;
