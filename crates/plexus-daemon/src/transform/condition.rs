//! Restricted condition expressions.
//!
//! Conditions guard transformer rules. The language is deliberately
//! tiny: dotted paths rooted at `data` or `context`, comparison
//! operators, and `&&` / `||` combination.
//!
//! ```text
//!   data.quantity > 0
//!   data.status == 'ready' && context.depth < 3
//!   data.urgent || data.retries >= 2
//! ```
//!
//! Expressions are scanned for forbidden constructs and parsed once
//! at registration; evaluation can then never raise. A path that
//! does not resolve makes its comparison false.

use crate::TransformError;
use serde_json::Value;

/// Substrings refused outright before parsing.
const FORBIDDEN: &[&str] = &["__", ";", "`", "(", ")", "{", "}", "import", "exec", "eval"];

/// Comparison operators, longest first so the scanner never splits
/// `>=` into `>` `=`.
const OPERATORS: &[(&str, Op)] = &[
    (">=", Op::Ge),
    ("<=", Op::Le),
    ("==", Op::Eq),
    ("!=", Op::Ne),
    (">", Op::Gt),
    ("<", Op::Lt),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone)]
enum Test {
    /// Bare path: true when present and truthy.
    Truthy,
    Cmp(Op, Value),
}

#[derive(Debug, Clone)]
struct Comparison {
    path: Vec<String>,
    test: Test,
}

/// A parsed condition expression.
///
/// Internally disjunctive normal form: an OR over AND-groups of
/// comparisons.
#[derive(Debug, Clone)]
pub struct Condition {
    expr: String,
    clauses: Vec<Vec<Comparison>>,
}

impl Condition {
    /// Parses an expression.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Condition`] for forbidden constructs
    /// or syntax the restricted grammar does not cover.
    pub fn parse(expr: &str) -> Result<Self, TransformError> {
        let reject = |message: String| TransformError::Condition {
            expr: expr.to_string(),
            message,
        };

        if expr.trim().is_empty() {
            return Err(reject("empty expression".into()));
        }
        for construct in FORBIDDEN {
            if expr.contains(construct) {
                return Err(reject(format!("forbidden construct '{construct}'")));
            }
        }

        let mut clauses = Vec::new();
        for clause in expr.split("||") {
            let mut comparisons = Vec::new();
            for term in clause.split("&&") {
                comparisons.push(parse_term(term).map_err(&reject)?);
            }
            clauses.push(comparisons);
        }

        Ok(Self {
            expr: expr.to_string(),
            clauses,
        })
    }

    /// The original expression text.
    #[must_use]
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// Evaluates against a scope of the form
    /// `{"data": ..., "context": ...}`.
    ///
    /// Never errors: an unresolved path or mismatched comparison
    /// types make the affected comparison false.
    #[must_use]
    pub fn eval(&self, scope: &Value) -> bool {
        self.clauses.iter().any(|clause| {
            clause.iter().all(|comparison| {
                let value = lookup(scope, &comparison.path);
                match &comparison.test {
                    Test::Truthy => value.is_some_and(is_truthy),
                    Test::Cmp(op, literal) => {
                        value.is_some_and(|v| compare(*op, v, literal))
                    }
                }
            })
        })
    }
}

fn parse_term(term: &str) -> Result<Comparison, String> {
    let term = term.trim();
    if term.is_empty() {
        return Err("empty term".into());
    }

    for (token, op) in OPERATORS {
        if let Some((lhs, rhs)) = term.split_once(token) {
            let path = parse_path(lhs.trim())?;
            let literal = parse_literal(rhs.trim())?;
            return Ok(Comparison {
                path,
                test: Test::Cmp(*op, literal),
            });
        }
    }

    // Bare path: existence / truthiness test.
    Ok(Comparison {
        path: parse_path(term)?,
        test: Test::Truthy,
    })
}

fn parse_path(text: &str) -> Result<Vec<String>, String> {
    if text.is_empty() {
        return Err("empty path".into());
    }
    let segments: Vec<String> = text.split('.').map(str::to_string).collect();
    if segments.iter().any(String::is_empty) {
        return Err(format!("empty segment in path '{text}'"));
    }
    if !segments
        .iter()
        .all(|s| s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'))
    {
        return Err(format!("invalid characters in path '{text}'"));
    }
    match segments[0].as_str() {
        "data" | "context" => Ok(segments),
        root => Err(format!("path must be rooted at data or context, got '{root}'")),
    }
}

fn parse_literal(text: &str) -> Result<Value, String> {
    if text.is_empty() {
        return Err("missing literal after operator".into());
    }
    if let Some(inner) = strip_quotes(text) {
        return Ok(Value::String(inner.to_string()));
    }
    match text {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }
    serde_json::from_str::<serde_json::Number>(text)
        .map(Value::Number)
        .map_err(|_| format!("invalid literal '{text}'"))
}

fn strip_quotes(text: &str) -> Option<&str> {
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return Some(&text[1..text.len() - 1]);
        }
    }
    None
}

fn lookup<'a>(scope: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut cursor = scope;
    for segment in path {
        cursor = cursor.as_object()?.get(segment)?;
    }
    Some(cursor)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn compare(op: Op, value: &Value, literal: &Value) -> bool {
    match op {
        Op::Eq => json_eq(value, literal),
        Op::Ne => !json_eq(value, literal),
        Op::Gt | Op::Ge | Op::Lt | Op::Le => {
            let ordering = if let (Some(a), Some(b)) = (value.as_f64(), literal.as_f64()) {
                a.partial_cmp(&b)
            } else if let (Some(a), Some(b)) = (value.as_str(), literal.as_str()) {
                Some(a.cmp(b))
            } else {
                // Mismatched types never order.
                None
            };
            match (op, ordering) {
                (Op::Gt, Some(std::cmp::Ordering::Greater)) => true,
                (Op::Ge, Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)) => true,
                (Op::Lt, Some(std::cmp::Ordering::Less)) => true,
                (Op::Le, Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)) => true,
                _ => false,
            }
        }
    }
}

/// Equality with numeric normalization so `5` == `5.0`.
fn json_eq(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x == y;
    }
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope(data: Value) -> Value {
        json!({"data": data, "context": {"depth": 1, "client_id": "cli-1"}})
    }

    fn eval(expr: &str, data: Value) -> bool {
        Condition::parse(expr)
            .expect("test expression should parse")
            .eval(&scope(data))
    }

    // ── Parsing ──────────────────────────────────────────────

    #[test]
    fn rejects_forbidden_constructs() {
        for expr in ["data.x == exec", "data.__class", "data.x; data.y", "f(data.x)"] {
            assert!(
                Condition::parse(expr).is_err(),
                "expected rejection of {expr:?}"
            );
        }
    }

    #[test]
    fn rejects_unrooted_path() {
        assert!(Condition::parse("quantity > 0").is_err());
    }

    #[test]
    fn rejects_truncated_comparison() {
        assert!(Condition::parse("data.x >").is_err());
        assert!(Condition::parse("data.x == ").is_err());
    }

    #[test]
    fn rejects_empty_expression() {
        assert!(Condition::parse("  ").is_err());
    }

    // ── Comparisons ──────────────────────────────────────────

    #[test]
    fn numeric_comparisons() {
        assert!(eval("data.qty > 0", json!({"qty": 3})));
        assert!(!eval("data.qty > 3", json!({"qty": 3})));
        assert!(eval("data.qty >= 3", json!({"qty": 3})));
        assert!(eval("data.qty < 10", json!({"qty": 3})));
        assert!(eval("data.qty != 4", json!({"qty": 3})));
    }

    #[test]
    fn string_equality_with_either_quote() {
        assert!(eval("data.status == 'ready'", json!({"status": "ready"})));
        assert!(eval("data.status == \"ready\"", json!({"status": "ready"})));
        assert!(!eval("data.status == 'done'", json!({"status": "ready"})));
    }

    #[test]
    fn nested_paths_resolve() {
        assert!(eval(
            "data.item.sku == 'X1'",
            json!({"item": {"sku": "X1"}})
        ));
    }

    #[test]
    fn context_paths_resolve() {
        assert!(eval("context.depth < 3", json!({})));
        assert!(eval("context.client_id == 'cli-1'", json!({})));
    }

    #[test]
    fn numeric_normalization() {
        assert!(eval("data.qty == 5", json!({"qty": 5.0})));
    }

    // ── Missing fields ───────────────────────────────────────

    #[test]
    fn missing_field_is_false_not_error() {
        assert!(!eval("data.absent > 0", json!({"qty": 3})));
        assert!(!eval("data.a.b.c == 'x'", json!({"a": 1})));
    }

    #[test]
    fn type_mismatch_ordering_is_false() {
        assert!(!eval("data.name > 5", json!({"name": "abc"})));
    }

    // ── Truthiness ───────────────────────────────────────────

    #[test]
    fn bare_path_truthiness() {
        assert!(eval("data.urgent", json!({"urgent": true})));
        assert!(!eval("data.urgent", json!({"urgent": false})));
        assert!(!eval("data.urgent", json!({})));
        assert!(!eval("data.note", json!({"note": ""})));
        assert!(eval("data.note", json!({"note": "hi"})));
    }

    // ── Combination ──────────────────────────────────────────

    #[test]
    fn and_requires_every_term() {
        let data = json!({"qty": 3, "status": "ready"});
        assert!(eval("data.qty > 0 && data.status == 'ready'", data.clone()));
        assert!(!eval("data.qty > 5 && data.status == 'ready'", data));
    }

    #[test]
    fn or_requires_any_clause() {
        let data = json!({"qty": 0, "urgent": true});
        assert!(eval("data.qty > 0 || data.urgent", data));
        assert!(!eval("data.qty > 0 || data.missing", json!({"qty": 0})));
    }
}
