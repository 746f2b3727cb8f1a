//! # attractor-pipeline
//!
//! Execution engine for Attractor pipelines: directed graphs of stages written
//! in DOT, run one stage at a time with conditional routing, retries, goal
//! gates, checkpoint/resume, parallel fan-out and nested pipelines.
//!
//! ## Architecture
//!
//! - [dot_parser] turns DOT source into an [AttractorGraph].
//! - [handlers] maps node types to [Handler]s through a [HandlerRegistry].
//! - [runner] drives the traversal: [select_edge](select_edge::select_edge) picks
//!   the next edge, [checkpoint_io] persists progress, [events] reports it.
//!
//! ```no_run
//! # async fn demo() -> attractor_pipeline::Result<()> {
//! use attractor_pipeline::{HandlerRegistry, PipelineRunner, RunnerConfig, parse_dot};
//!
//! let graph = parse_dot("digraph G { start [shape=Mdiamond]; exit [shape=Msquare]; start -> exit }")?;
//! let runner = PipelineRunner::with_config(
//!   HandlerRegistry::builder().build(),
//!   RunnerConfig::new().with_logs_root(".attractor"),
//! );
//! let result = runner.run(&graph).await?;
//! println!("{}: {:?}", result.status, result.completed_nodes);
//! # Ok(())
//! # }
//! ```

pub mod checkpoint_io;
#[cfg(test)]
mod checkpoint_io_test;
pub mod condition;
#[cfg(test)]
mod condition_test;
pub mod dot_parser;
pub mod error;
pub mod events;
pub mod graph_source;
pub mod handlers;
pub mod runner;
pub mod select_edge;
pub mod types;

pub use checkpoint_io::{CHECKPOINT_FILENAME, load_checkpoint, save_checkpoint};
pub use condition::evaluate_condition;
pub use dot_parser::parse_dot;
pub use error::{AttractorError, Result};
pub use events::{EventBus, EventEmitter, MemoryEmitter, NoopEmitter};
pub use graph_source::{DotFileSource, GraphSource, InMemoryGraphSource};
pub use handlers::{Handler, HandlerOutput, HandlerRegistry, RegistryBuilder};
pub use runner::{PipelineResult, PipelineRunner, PipelineStatus, RunnerConfig};
pub use select_edge::select_edge;
pub use types::{
  AttrValue, AttractorEdge, AttractorGraph, AttractorNode, Checkpoint, EventKind, NodeOutcome,
  OutcomeStatus, PipelineEvent, RunContext,
};
