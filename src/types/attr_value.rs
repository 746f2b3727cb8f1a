//! Typed attribute value attached to graphs, nodes and edges.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An attribute value: string, integer or boolean.
///
/// Also used for `NodeOutcome::context_updates`, which accept the same three
/// kinds before they are flattened to strings in the run context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
  Boolean(bool),
  Integer(i64),
  String(String),
}

impl AttrValue {
  /// Interprets the value as an integer. Strings are parsed.
  pub fn as_int(&self) -> Option<i64> {
    match self {
      AttrValue::Integer(i) => Some(*i),
      AttrValue::String(s) => s.trim().parse().ok(),
      AttrValue::Boolean(_) => None,
    }
  }

  /// Interprets the value as a boolean. Strings `true`/`false`/`1`/`0` are accepted.
  pub fn as_bool(&self) -> Option<bool> {
    match self {
      AttrValue::Boolean(b) => Some(*b),
      AttrValue::Integer(i) => Some(*i != 0),
      AttrValue::String(s) => parse_bool(s),
    }
  }

  /// Borrowed string view; `None` for integers and booleans.
  pub fn as_str(&self) -> Option<&str> {
    match self {
      AttrValue::String(s) => Some(s),
      _ => None,
    }
  }
}

/// Parses the boolean spellings accepted in attributes and context values.
pub(crate) fn parse_bool(s: &str) -> Option<bool> {
  match s.trim().to_ascii_lowercase().as_str() {
    "true" | "1" | "yes" => Some(true),
    "false" | "0" | "no" => Some(false),
    _ => None,
  }
}

impl fmt::Display for AttrValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AttrValue::Boolean(b) => write!(f, "{}", b),
      AttrValue::Integer(i) => write!(f, "{}", i),
      AttrValue::String(s) => f.write_str(s),
    }
  }
}

impl From<&str> for AttrValue {
  fn from(s: &str) -> Self {
    AttrValue::String(s.to_string())
  }
}

impl From<String> for AttrValue {
  fn from(s: String) -> Self {
    AttrValue::String(s)
  }
}

impl From<i64> for AttrValue {
  fn from(i: i64) -> Self {
    AttrValue::Integer(i)
  }
}

impl From<i32> for AttrValue {
  fn from(i: i32) -> Self {
    AttrValue::Integer(i64::from(i))
  }
}

impl From<bool> for AttrValue {
  fn from(b: bool) -> Self {
    AttrValue::Boolean(b)
  }
}
