//! Event emission for pipeline lifecycle events.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::types::{EventKind, PipelineEvent};

/// Sink for pipeline lifecycle events.
pub trait EventEmitter: Send + Sync {
  fn emit(&self, event: PipelineEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEmitter;

impl EventEmitter for NoopEmitter {
  fn emit(&self, _event: PipelineEvent) {}
}

/// Event bus using a tokio broadcast channel. All subscribers receive all events.
pub struct EventBus {
  tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
    self.tx.subscribe()
  }
}

impl Default for EventBus {
  fn default() -> Self {
    Self::new(256)
  }
}

impl EventEmitter for EventBus {
  fn emit(&self, event: PipelineEvent) {
    // Ignore error if no receivers
    let _ = self.tx.send(event);
  }
}

/// Keeps every event in memory, in emission order.
#[derive(Default, Clone)]
pub struct MemoryEmitter {
  events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl MemoryEmitter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn events(&self) -> Vec<PipelineEvent> {
    match self.events.lock() {
      Ok(guard) => guard.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }

  pub fn of_kind(&self, kind: EventKind) -> Vec<PipelineEvent> {
    self
      .events()
      .into_iter()
      .filter(|e| e.kind == kind)
      .collect()
  }
}

impl EventEmitter for MemoryEmitter {
  fn emit(&self, event: PipelineEvent) {
    match self.events.lock() {
      Ok(mut guard) => guard.push(event),
      Err(poisoned) => poisoned.into_inner().push(event),
    }
  }
}
