//! Edge condition mini-language.
//!
//! A condition is zero or more clauses joined by `&&`:
//!
//! - `key=value` / `key!=value` (value may be a bare token or a double-quoted literal)
//! - `key` (truthy when the resolved value is non-empty)
//!
//! Keys resolve against the stage outcome and the run context: `outcome` is the
//! status string, `preferred_label` the outcome's preferred label, `context.<k>`
//! looks up `context.<k>` then `<k>`, and any other key is a direct context lookup.
//! Missing keys resolve to the empty string.

use std::fmt;

use tracing::instrument;

use crate::types::{NodeOutcome, RunContext};

/// One clause of a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
  Equals { key: String, value: String },
  NotEquals { key: String, value: String },
  Truthy { key: String },
}

/// A parsed condition: all clauses must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Condition {
  pub clauses: Vec<Clause>,
}

/// Error raised for a malformed clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionError {
  pub clause: String,
  pub message: &'static str,
}

impl fmt::Display for ConditionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "invalid clause '{}': {}", self.clause, self.message)
  }
}

impl std::error::Error for ConditionError {}

impl Condition {
  /// Parses a condition string. Blank input yields the always-true condition.
  pub fn parse(source: &str) -> Result<Self, ConditionError> {
    if source.trim().is_empty() {
      return Ok(Self::default());
    }
    let clauses = split_clauses(source)
      .into_iter()
      .map(parse_clause)
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self { clauses })
  }

  /// True when every clause holds against `(outcome, context)`.
  pub fn evaluate(&self, outcome: &NodeOutcome, context: &RunContext) -> bool {
    self.clauses.iter().all(|c| match c {
      Clause::Equals { key, value } => {
        values_match(key, &resolve_key(key, outcome, context), value)
      }
      Clause::NotEquals { key, value } => {
        !values_match(key, &resolve_key(key, outcome, context), value)
      }
      Clause::Truthy { key } => !resolve_key(key, outcome, context).is_empty(),
    })
  }
}

/// Splits on `&&` outside double quotes.
fn split_clauses(source: &str) -> Vec<&str> {
  let mut parts = Vec::new();
  let mut start = 0;
  let mut quoted = false;
  let bytes = source.as_bytes();
  let mut i = 0;
  while i < bytes.len() {
    match bytes[i] {
      b'"' => quoted = !quoted,
      b'&' if !quoted && bytes.get(i + 1) == Some(&b'&') => {
        parts.push(&source[start..i]);
        i += 2;
        start = i;
        continue;
      }
      _ => {}
    }
    i += 1;
  }
  parts.push(&source[start..]);
  parts
}

fn parse_clause(raw: &str) -> Result<Clause, ConditionError> {
  let clause = raw.trim();
  let err = |message| ConditionError {
    clause: clause.to_string(),
    message,
  };
  if clause.is_empty() {
    return Err(err("empty clause"));
  }
  if clause.matches('"').count() % 2 != 0 {
    return Err(err("unterminated quote"));
  }
  // Operators only count in the key portion, before any quoted literal.
  let head = &clause[..clause.find('"').unwrap_or(clause.len())];
  if let Some(i) = head.find("!=") {
    let (key, value) = (clause[..i].trim(), &clause[i + 2..]);
    if key.is_empty() {
      return Err(err("missing key"));
    }
    return Ok(Clause::NotEquals {
      key: key.to_string(),
      value: parse_literal(value),
    });
  }
  if let Some(i) = head.find('=') {
    let (key, value) = (clause[..i].trim(), &clause[i + 1..]);
    if key.is_empty() {
      return Err(err("missing key"));
    }
    return Ok(Clause::Equals {
      key: key.to_string(),
      value: parse_literal(value),
    });
  }
  if clause.chars().any(char::is_whitespace) {
    return Err(err("bare key must be a single token"));
  }
  Ok(Clause::Truthy {
    key: clause.to_string(),
  })
}

/// Bare token or double-quoted literal (quotes removed, contents taken verbatim).
fn parse_literal(raw: &str) -> String {
  let v = raw.trim();
  if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
    v[1..v.len() - 1].to_string()
  } else {
    v.to_string()
  }
}

/// Status comparisons ignore case so `outcome=SUCCESS` and `outcome=success` agree.
fn values_match(key: &str, actual: &str, expected: &str) -> bool {
  if key == "outcome" {
    actual.eq_ignore_ascii_case(expected)
  } else {
    actual == expected
  }
}

/// Resolves a clause key to its current string value.
#[instrument(level = "trace", skip(outcome, context))]
pub fn resolve_key(key: &str, outcome: &NodeOutcome, context: &RunContext) -> String {
  match key {
    "outcome" => outcome.status.as_str().to_string(),
    "preferred_label" => outcome.preferred_label.clone().unwrap_or_default(),
    _ => {
      if let Some(bare) = key.strip_prefix("context.") {
        context
          .get(key)
          .or_else(|| context.get(bare))
          .unwrap_or_default()
          .to_string()
      } else {
        context.get(key).unwrap_or_default().to_string()
      }
    }
  }
}

/// Parses and evaluates `source`. Malformed conditions evaluate to false.
pub fn evaluate_condition(source: &str, outcome: &NodeOutcome, context: &RunContext) -> bool {
  match Condition::parse(source) {
    Ok(c) => c.evaluate(outcome, context),
    Err(e) => {
      tracing::warn!(condition = %source, error = %e, "unparsable edge condition treated as false");
      false
    }
  }
}
