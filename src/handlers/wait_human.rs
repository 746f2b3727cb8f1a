//! Human gate (hexagon): asks an [Interviewer] to pick one of the outgoing edges.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use super::{Handler, HandlerOutput};
use crate::error::Result;
use crate::select_edge::normalize_label;
use crate::types::{AttractorGraph, AttractorNode, NodeOutcome, RunContext};

/// One selectable answer: an edge label and the node it leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOption {
  pub label: String,
  pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
  pub stage: String,
  pub text: String,
  pub options: Vec<QuestionOption>,
}

/// Answers human-gate questions. `None` means no answer was given.
#[async_trait]
pub trait Interviewer: Send + Sync {
  async fn ask(&self, question: &Question) -> Option<String>;
}

/// Always picks the first option.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApproveInterviewer;

#[async_trait]
impl Interviewer for AutoApproveInterviewer {
  async fn ask(&self, question: &Question) -> Option<String> {
    question.options.first().map(|o| o.label.clone())
  }
}

/// Replays scripted answers in order; answers `None` once exhausted.
#[derive(Debug, Default)]
pub struct QueueInterviewer {
  answers: Mutex<VecDeque<String>>,
}

impl QueueInterviewer {
  pub fn new<I, S>(answers: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
    }
  }
}

#[async_trait]
impl Interviewer for QueueInterviewer {
  async fn ask(&self, _question: &Question) -> Option<String> {
    match self.answers.lock() {
      Ok(mut q) => q.pop_front(),
      Err(poisoned) => poisoned.into_inner().pop_front(),
    }
  }
}

pub struct WaitHumanHandler {
  interviewer: Arc<dyn Interviewer>,
}

impl WaitHumanHandler {
  pub fn new(interviewer: Arc<dyn Interviewer>) -> Self {
    Self { interviewer }
  }
}

/// Matches an answer against option labels (accelerators ignored) or targets.
fn match_option<'a>(answer: &str, options: &'a [QuestionOption]) -> Option<&'a QuestionOption> {
  let wanted = normalize_label(answer);
  options
    .iter()
    .find(|o| normalize_label(&o.label) == wanted)
    .or_else(|| options.iter().find(|o| o.target == answer.trim()))
}

#[async_trait]
impl Handler for WaitHumanHandler {
  async fn execute(
    &self,
    node: &AttractorNode,
    _context: &RunContext,
    graph: &AttractorGraph,
    _logs_root: &Path,
  ) -> Result<HandlerOutput> {
    let options: Vec<QuestionOption> = graph
      .outgoing_edges(&node.id)
      .into_iter()
      .map(|e| QuestionOption {
        label: e.label().unwrap_or_else(|| e.to_node.clone()),
        target: e.to_node.clone(),
      })
      .collect();
    if options.is_empty() {
      return Ok(NodeOutcome::fail("No outgoing edges for human gate").into());
    }
    let question = Question {
      stage: node.id.clone(),
      text: node.label(),
      options,
    };
    let Some(answer) = self.interviewer.ask(&question).await else {
      return Ok(NodeOutcome::fail("human gate received no answer").into());
    };
    // Unrecognised answers fall back to the first option.
    let chosen = match_option(&answer, &question.options).unwrap_or(&question.options[0]);
    info!(node = %node.id, answer = %answer, target = %chosen.target, "human gate answered");
    Ok(
      NodeOutcome::success(format!("Human selected: {}", chosen.label))
        .with_preferred_label(chosen.label.clone())
        .with_suggested_next(vec![chosen.target.clone()])
        .with_update("human.gate.selected", chosen.target.clone())
        .with_update("human.gate.label", chosen.label.clone())
        .into(),
    )
  }
}
