//! Tests for `condition`.

use crate::condition::{Clause, Condition, evaluate_condition, resolve_key};
use crate::types::{NodeOutcome, RunContext};

fn ctx(pairs: &[(&str, &str)]) -> RunContext {
  let mut c = RunContext::new();
  for (k, v) in pairs {
    c.set(*k, *v);
  }
  c
}

#[test]
fn blank_condition_is_always_true() {
  let c = Condition::parse("   ").unwrap();
  assert!(c.clauses.is_empty());
  assert!(c.evaluate(&NodeOutcome::fail("x"), &RunContext::new()));
}

#[test]
fn parses_clause_kinds() {
  let c = Condition::parse(r#"outcome=success && tests!="red" && ready"#).unwrap();
  assert_eq!(
    c.clauses,
    vec![
      Clause::Equals {
        key: "outcome".to_string(),
        value: "success".to_string()
      },
      Clause::NotEquals {
        key: "tests".to_string(),
        value: "red".to_string()
      },
      Clause::Truthy {
        key: "ready".to_string()
      },
    ]
  );
}

#[test]
fn outcome_matches_status_case_insensitively() {
  let o = NodeOutcome::success("x");
  assert!(evaluate_condition("outcome=success", &o, &RunContext::new()));
  assert!(evaluate_condition("outcome=SUCCESS", &o, &RunContext::new()));
  assert!(!evaluate_condition("outcome=fail", &o, &RunContext::new()));
  assert!(evaluate_condition("outcome!=fail", &o, &RunContext::new()));
}

#[test]
fn outcome_key_ignores_context_value() {
  let c = ctx(&[("outcome", "fail")]);
  assert!(evaluate_condition("outcome=success", &NodeOutcome::success("x"), &c));
}

#[test]
fn context_prefix_falls_back_to_bare_key() {
  let o = NodeOutcome::success("x");
  let c = ctx(&[("has_tasks", "true")]);
  assert!(evaluate_condition("context.has_tasks=true", &o, &c));
  let c = ctx(&[("context.has_tasks", "false"), ("has_tasks", "true")]);
  assert!(evaluate_condition("context.has_tasks=false", &o, &c));
}

#[test]
fn missing_keys_resolve_empty() {
  let o = NodeOutcome::success("x");
  assert_eq!(resolve_key("nothing", &o, &RunContext::new()), "");
  assert!(!evaluate_condition("nothing", &o, &RunContext::new()));
  assert!(evaluate_condition("nothing!=x", &o, &RunContext::new()));
  assert!(evaluate_condition(r#"nothing="""#, &o, &RunContext::new()));
}

#[test]
fn preferred_label_key() {
  let o = NodeOutcome::success("x").with_preferred_label("Approve");
  assert!(evaluate_condition("preferred_label=Approve", &o, &RunContext::new()));
  assert!(evaluate_condition("preferred_label", &o, &RunContext::new()));
}

#[test]
fn quoted_values_are_literal() {
  let o = NodeOutcome::success("x");
  let c = ctx(&[("msg", "hello world")]);
  assert!(evaluate_condition(r#"msg="hello world""#, &o, &c));
  let c = ctx(&[("path", r"a\nb")]);
  assert!(evaluate_condition(r#"path="a\nb""#, &o, &c));
}

#[test]
fn quoted_values_keep_operators() {
  assert_eq!(
    Condition::parse(r#"msg="a!=b""#).unwrap().clauses,
    vec![Clause::Equals {
      key: "msg".to_string(),
      value: "a!=b".to_string()
    }]
  );
  assert_eq!(
    Condition::parse(r#"msg!="k=v""#).unwrap().clauses,
    vec![Clause::NotEquals {
      key: "msg".to_string(),
      value: "k=v".to_string()
    }]
  );

  let o = NodeOutcome::success("x");
  let c = ctx(&[("pair", "x && y"), ("ready", "yes")]);
  assert!(evaluate_condition(r#"pair="x && y""#, &o, &c));
  assert!(evaluate_condition(r#"pair="x && y" && ready"#, &o, &c));
  assert!(!evaluate_condition(r#"pair="x""#, &o, &c));
}

#[test]
fn unterminated_quote_is_rejected() {
  assert!(Condition::parse(r#"msg="a"#).is_err());
  assert!(!evaluate_condition(r#"msg="a"#, &NodeOutcome::success("x"), &RunContext::new()));
}

#[test]
fn all_clauses_must_hold() {
  let o = NodeOutcome::success("x");
  let c = ctx(&[("a", "1"), ("b", "2")]);
  assert!(evaluate_condition("a=1 && b=2", &o, &c));
  assert!(!evaluate_condition("a=1 && b=3", &o, &c));
}

#[test]
fn malformed_condition_is_false() {
  let o = NodeOutcome::success("x");
  assert!(Condition::parse("=x").is_err());
  assert!(Condition::parse("a=1 && ").is_err());
  assert!(!evaluate_condition("=x", &o, &RunContext::new()));
  assert!(!evaluate_condition("two words", &o, &RunContext::new()));
}
