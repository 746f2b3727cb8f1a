//! Outcome status for a node execution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Outcome status for a node execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
  Success,
  Fail,
  Retry,
}

impl OutcomeStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      OutcomeStatus::Success => "success",
      OutcomeStatus::Fail => "fail",
      OutcomeStatus::Retry => "retry",
    }
  }
}

impl fmt::Display for OutcomeStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OutcomeStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "success" => Ok(OutcomeStatus::Success),
      "fail" | "failure" | "error" => Ok(OutcomeStatus::Fail),
      "retry" => Ok(OutcomeStatus::Retry),
      other => Err(format!("unknown outcome status: {}", other)),
    }
  }
}
