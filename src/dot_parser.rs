//! Minimal DOT parser for Attractor pipeline graphs.
//!
//! Supports the subset pipelines use: one `digraph`, graph attributes
//! (`graph [...]` or top-level `key=value`), `node [...]`/`edge [...]` defaults,
//! node statements, edge chains (`a -> b -> c [...]`), flattened subgraphs, and
//! `//`, `/* */` comments. Attribute values keep their type: quoted strings stay
//! strings, bare integers become integers, bare `true`/`false` become booleans.

use std::collections::HashMap;

use tracing::instrument;

use crate::error::{AttractorError, Result};
use crate::types::{AttrValue, AttractorEdge, AttractorGraph, AttractorNode};

/// List of key-value attribute pairs from DOT `[key=value,...]` blocks.
type AttrList = Vec<(String, AttrValue)>;

fn parse_err(msg: impl Into<String>) -> AttractorError {
  AttractorError::Parse(msg.into())
}

/// Default attributes in effect for the current (sub)graph scope.
#[derive(Clone, Default)]
struct Defaults {
  node: AttrList,
  edge: AttrList,
}

/// Parse a DOT source string into an AttractorGraph.
#[instrument(level = "trace", skip(source))]
pub fn parse_dot(source: &str) -> Result<AttractorGraph> {
  let source = strip_comments(source);
  let source = source.trim();

  let rest = source
    .strip_prefix("digraph")
    .ok_or_else(|| parse_err("Expected 'digraph' at start"))?
    .trim_start();
  let (name, rest) = match parse_identifier(rest) {
    Some((name, rest)) => (name.to_string(), rest.trim_start()),
    None => (String::new(), rest),
  };
  let rest = rest
    .strip_prefix('{')
    .ok_or_else(|| parse_err("Expected '{' after graph name"))?;

  let mut graph = AttractorGraph::new(name);
  let mut defaults = Defaults::default();
  let rest = parse_body(rest, &mut graph, &mut defaults)?;
  if !rest.trim_start().starts_with('}') {
    return Err(parse_err("Expected '}' at end of graph"));
  }
  Ok(graph)
}

/// Parses statements until the closing `}` (not consumed).
fn parse_body<'a>(
  s: &'a str,
  graph: &mut AttractorGraph,
  defaults: &mut Defaults,
) -> Result<&'a str> {
  let mut remaining = s.trim_start();
  while !remaining.is_empty() && !remaining.starts_with('}') {
    remaining = parse_statement(remaining, graph, defaults)?;
    remaining = remaining.trim_start().trim_start_matches(';').trim_start();
  }
  Ok(remaining)
}

/// Strips `//` and `/* */` style comments from DOT source, leaving quoted strings intact.
pub(crate) fn strip_comments(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut chars = s.chars().peekable();
  let mut in_string = false;
  while let Some(c) = chars.next() {
    if in_string {
      out.push(c);
      if c == '\\' {
        if let Some(n) = chars.next() {
          out.push(n);
        }
      } else if c == '"' {
        in_string = false;
      }
      continue;
    }
    match (c, chars.peek()) {
      ('"', _) => {
        in_string = true;
        out.push(c);
      }
      ('/', Some('/')) => {
        for n in chars.by_ref() {
          if n == '\n' {
            out.push('\n');
            break;
          }
        }
      }
      ('/', Some('*')) => {
        chars.next();
        let mut prev = '\0';
        for n in chars.by_ref() {
          if prev == '*' && n == '/' {
            break;
          }
          prev = n;
        }
      }
      _ => out.push(c),
    }
  }
  out
}

/// Parses an identifier (alphanumeric, underscore, dot; not starting with a digit or dot)
/// and returns it plus the remaining string.
pub(crate) fn parse_identifier(s: &str) -> Option<(&str, &str)> {
  let s = s.trim_start();
  let first = s.chars().next()?;
  if !(first.is_ascii_alphabetic() || first == '_') {
    return None;
  }
  let end = s
    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
    .unwrap_or(s.len());
  Some((&s[..end], &s[end..]))
}

/// Parses a node id: an identifier or a quoted string.
fn parse_node_id(s: &str) -> Option<(String, &str)> {
  let s = s.trim_start();
  if s.starts_with('"') {
    return parse_quoted(s).ok();
  }
  parse_identifier(s).map(|(id, rest)| (id.to_string(), rest))
}

/// Parses a single graph statement and updates `graph`. Returns the unconsumed remainder.
fn parse_statement<'a>(
  s: &'a str,
  graph: &mut AttractorGraph,
  defaults: &mut Defaults,
) -> Result<&'a str> {
  let s = s.trim_start();
  if let Some(rest) = keyword(s, "subgraph") {
    return parse_subgraph(rest, graph, defaults);
  }
  if s.starts_with('{') {
    return parse_subgraph(s, graph, defaults);
  }
  for kw in ["graph", "node", "edge"] {
    let Some(rest) = keyword(s, kw) else {
      continue;
    };
    if rest.trim_start().starts_with('[') {
      let (attrs, rest) = parse_attr_block(rest)?;
      match kw {
        "graph" => apply_graph_attrs(attrs, graph),
        "node" => defaults.node.extend(attrs),
        _ => defaults.edge.extend(attrs),
      }
      return Ok(rest);
    }
  }

  let (id, rest) = parse_node_id(s).ok_or_else(|| parse_err(format!("Expected identifier near '{}'", preview(s))))?;
  let rest = rest.trim_start();

  if let Some(value) = rest.strip_prefix('=') {
    let (v, rest) = parse_value(value)?;
    graph.attributes.insert(id, v);
    return Ok(rest);
  }

  if rest.starts_with("->") {
    return parse_edge_stmt(id, rest, graph, defaults);
  }

  let (attrs, rest) = if rest.starts_with('[') {
    parse_attr_block(rest)?
  } else {
    (Vec::new(), rest)
  };
  declare_node(graph, &id, &defaults.node, attrs);
  Ok(rest)
}

/// Matches `kw` as a whole word at the start of `s`.
fn keyword<'a>(s: &'a str, kw: &str) -> Option<&'a str> {
  let rest = s.strip_prefix(kw)?;
  match rest.chars().next() {
    Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '.' => None,
    _ => Some(rest),
  }
}

fn preview(s: &str) -> String {
  s.chars().take(20).collect()
}

/// Adds or merges a node, applying `defaults` first and explicit attributes on top.
fn declare_node(graph: &mut AttractorGraph, id: &str, defaults: &[(String, AttrValue)], attrs: AttrList) {
  let node = graph.nodes.entry(id.to_string()).or_insert_with(|| {
    let mut n = AttractorNode::new(id);
    for (k, v) in defaults {
      n.attributes.insert(k.clone(), v.clone());
    }
    n
  });
  for (k, v) in attrs {
    node.attributes.insert(k, v);
  }
}

/// Applies `graph [...]` attributes.
pub(crate) fn apply_graph_attrs(attrs: AttrList, graph: &mut AttractorGraph) {
  for (k, v) in attrs {
    graph.attributes.insert(k, v);
  }
}

/// Parses `subgraph name { ... }`; statements are flattened into `graph` with scoped defaults.
fn parse_subgraph<'a>(
  s: &'a str,
  graph: &mut AttractorGraph,
  defaults: &Defaults,
) -> Result<&'a str> {
  let s = s.trim_start();
  let s = match parse_identifier(s) {
    Some((_, rest)) => rest.trim_start(),
    None => s,
  };
  let body = s
    .strip_prefix('{')
    .ok_or_else(|| parse_err("Expected '{' after subgraph"))?;
  let mut scoped = defaults.clone();
  let rest = parse_body(body, graph, &mut scoped)?;
  rest
    .strip_prefix('}')
    .ok_or_else(|| parse_err("Unclosed subgraph"))
}

/// Parses `[key=value,...]` and returns the attributes plus the remainder.
fn parse_attr_block(s: &str) -> Result<(AttrList, &str)> {
  let s = s
    .trim_start()
    .strip_prefix('[')
    .ok_or_else(|| parse_err("Expected '['"))?;
  let mut attrs = Vec::new();
  let mut remaining = s.trim_start();
  loop {
    remaining = remaining.trim_start().trim_start_matches([',', ';']).trim_start();
    if let Some(rest) = remaining.strip_prefix(']') {
      return Ok((attrs, rest));
    }
    if remaining.is_empty() {
      return Err(parse_err("Unclosed attribute block"));
    }
    let (k, rest) = parse_identifier(remaining).ok_or_else(|| parse_err("Expected attribute key"))?;
    let rest = rest
      .trim_start()
      .strip_prefix('=')
      .ok_or_else(|| parse_err(format!("Expected '=' after attribute '{}'", k)))?;
    let (v, rest) = parse_value(rest)?;
    attrs.push((k.to_string(), v));
    remaining = rest;
  }
}

/// Unescapes DOT quoted string escape sequences (\\n, \\t, \\\", \\\\).
pub(crate) fn unescape_quoted_string(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut chars = s.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match chars.next() {
      Some('n') => out.push('\n'),
      Some('t') => out.push('\t'),
      Some('"') => out.push('"'),
      Some('\\') => out.push('\\'),
      Some(other) => {
        out.push('\\');
        out.push(other);
      }
      None => out.push('\\'),
    }
  }
  out
}

/// Parses a double-quoted string starting at `s[0]`.
fn parse_quoted(s: &str) -> Result<(String, &str)> {
  let bytes = s.as_bytes();
  let mut end = 1;
  while end < bytes.len() {
    match bytes[end] {
      b'\\' => end += 2,
      b'"' => {
        let v = unescape_quoted_string(&s[1..end]);
        return Ok((v, &s[end + 1..]));
      }
      _ => end += 1,
    }
  }
  Err(parse_err("Unterminated string"))
}

/// Parses a quoted string, number, or identifier value and returns it plus the remainder.
pub(crate) fn parse_value(s: &str) -> Result<(AttrValue, &str)> {
  let s = s.trim_start();
  if s.starts_with('"') {
    let (v, rest) = parse_quoted(s)?;
    return Ok((AttrValue::String(v), rest));
  }
  if let Some((num, rest)) = parse_number(s) {
    let v = num
      .parse::<i64>()
      .map(AttrValue::Integer)
      .unwrap_or(AttrValue::String(num));
    return Ok((v, rest));
  }
  let (id, rest) = parse_identifier(s).ok_or_else(|| parse_err(format!("Expected value near '{}'", preview(s))))?;
  let v = match id {
    "true" => AttrValue::Boolean(true),
    "false" => AttrValue::Boolean(false),
    other => AttrValue::String(other.to_string()),
  };
  Ok((v, rest))
}

/// Parses an optional signed decimal number and returns it plus the remainder.
pub(crate) fn parse_number(s: &str) -> Option<(String, &str)> {
  let s = s.trim_start();
  let bytes = s.as_bytes();
  let mut end = 0;
  if end < bytes.len() && bytes[end] == b'-' {
    end += 1;
  }
  let digits_start = end;
  while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
    end += 1;
  }
  if end == digits_start {
    return None;
  }
  Some((s[..end].to_string(), &s[end..]))
}

/// Parses an edge statement `id -> target [-> ...] [attrs]` and adds edges to `graph`.
fn parse_edge_stmt<'a>(
  from: String,
  s: &'a str,
  graph: &mut AttractorGraph,
  defaults: &Defaults,
) -> Result<&'a str> {
  let mut chain = vec![from];
  let mut s = s;
  while let Some(rest) = s.trim_start().strip_prefix("->") {
    let (to, rest) = parse_node_id(rest).ok_or_else(|| parse_err("Expected target node"))?;
    chain.push(to);
    s = rest;
  }
  let s = s.trim_start();
  let (attrs, rest) = if s.starts_with('[') {
    parse_attr_block(s)?
  } else {
    (Vec::new(), s)
  };

  let mut edge_attrs: HashMap<String, AttrValue> = defaults.edge.iter().cloned().collect();
  edge_attrs.extend(attrs);

  for id in &chain {
    declare_node(graph, id, &defaults.node, Vec::new());
  }
  for pair in chain.windows(2) {
    graph.edges.push(AttractorEdge {
      from_node: pair[0].clone(),
      to_node: pair[1].clone(),
      attributes: edge_attrs.clone(),
    });
  }
  Ok(rest)
}
