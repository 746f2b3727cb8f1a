//! CLI: run an Attractor pipeline from a .dot file.
//!
//! Usage: `run_dot [OPTIONS] <path-to-dot-file>`
//!
//! Checkpoints and stage logs go under `--logs-root` (default `.attractor`).
//! `--resume <checkpoint>` continues a run from a saved checkpoint. Ctrl-C
//! cancels the run after the current stage.
//!
//! Set RUST_LOG=attractor_pipeline=debug for per-stage events.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use attractor_pipeline::handlers::CommandBackend;
use attractor_pipeline::{
  DotFileSource, HandlerRegistry, PipelineRunner, PipelineStatus, RunnerConfig, parse_dot,
};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Run an Attractor pipeline from a .dot file.
#[derive(Parser, Debug)]
#[command(name = "run_dot")]
#[command(after_help = r#"Examples:
  run_dot pipeline.dot
  run_dot --logs-root /tmp/run --resume /tmp/run/checkpoint.json pipeline.dot
  run_dot --agent-cmd "my-agent --stdin" pipeline.dot"#)]
struct Args {
  /// Directory for checkpoints and stage logs
  #[arg(long, value_name = "DIR", env = "ATTRACTOR_LOGS_ROOT", default_value = ".attractor")]
  logs_root: PathBuf,

  /// Resume from this checkpoint file instead of starting at the start node
  #[arg(long, value_name = "CHECKPOINT")]
  resume: Option<PathBuf>,

  /// Run id (default: random UUID)
  #[arg(long, value_name = "ID", env = "ATTRACTOR_RUN_ID")]
  run_id: Option<String>,

  /// Maximum number of executed stages
  #[arg(long, value_name = "N", default_value_t = 1000)]
  max_steps: usize,

  /// Command for codergen stages; the prompt is written to its stdin.
  /// Without it, codergen stages are simulated.
  #[arg(long, value_name = "CMD", env = "ATTRACTOR_AGENT_CMD")]
  agent_cmd: Option<String>,

  /// Path to the .dot pipeline file
  #[arg(value_name = "path-to-dot-file")]
  dot_path: PathBuf,
}

fn fail(message: String) -> ! {
  eprintln!("Error: {}", message);
  process::exit(1);
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let path = &args.dot_path;
  let dot = fs::read_to_string(path)
    .unwrap_or_else(|e| fail(format!("reading {}: {}", path.display(), e)));
  let graph = parse_dot(&dot).unwrap_or_else(|e| fail(e.to_string()));

  let cancel = CancellationToken::new();
  let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
  let mut builder = HandlerRegistry::builder()
    .graph_source(Arc::new(DotFileSource::with_base_dir(base_dir)))
    .cancel_token(cancel.clone());
  if let Some(cmd) = &args.agent_cmd {
    builder = builder.backend(Arc::new(CommandBackend::new(cmd.clone())));
  }

  let mut config = RunnerConfig::new()
    .with_logs_root(&args.logs_root)
    .with_cancel(cancel.clone())
    .with_max_steps(args.max_steps);
  if let Some(id) = &args.run_id {
    config = config.with_run_id(id.clone());
  }
  let runner = PipelineRunner::with_config(builder.build(), config);

  let on_signal = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupt received, cancelling after the current stage");
      on_signal.cancel();
    }
  });

  info!(graph = %graph.name, logs_root = %args.logs_root.display(), resume = ?args.resume, "run_dot starting");
  let run = match &args.resume {
    Some(checkpoint) => runner.resume(&graph, checkpoint).await,
    None => runner.run(&graph).await,
  };
  let result = run.unwrap_or_else(|e| fail(format!("pipeline error: {}", e)));

  println!("Pipeline {}.", result.status);
  println!("  Completed nodes: {:?}", result.completed_nodes);
  if let Some(reason) = &result.failure_reason {
    println!("  Reason: {}", reason);
  }
  if result.status != PipelineStatus::Success {
    process::exit(1);
  }
}
