//! Structured-path extraction for test items that declare a `path`.
//!
//! The audit output is parsed as JSON, falling back to YAML, and the path is
//! evaluated against the resulting document. Paths use the familiar
//! template form `{.metadata.name}`: text outside braces is copied verbatim,
//! each `{…}` expression is replaced by the values it selects. A path without
//! any braces is treated as a single expression.
//!
//! Supported expression segments:
//!
//! | Segment | Meaning |
//! |---------|---------|
//! | `.name` / `['name']` | object member |
//! | `[2]` / `[-1]` | array element (negative counts from the end) |
//! | `[*]` / `.*` | every element or member |
//!
//! Missing members select nothing, which renders as an empty string.
//! Only the JSONPath subset used by benchmark definitions is supported: no
//! filters, slices or recursive descent.

use super::EvalError;
use serde_json::Value;

/// Parses `input` as JSON, or as YAML if it is not valid JSON.
pub fn parse_document(input: &str) -> Result<Value, EvalError> {
    match serde_json::from_str::<Value>(input) {
        Ok(v) => Ok(v),
        Err(_) => serde_yaml::from_str::<Value>(input)
            .map_err(|e| EvalError::UnparsableDocument(e.to_string())),
    }
}

/// Evaluates `path` against `doc` and renders the selected values.
///
/// Multiple selected values are joined with a single space.
///
/// # Examples
///
/// ```
/// use oxidized_bench::eval::path::{evaluate, parse_document};
///
/// let doc = parse_document(r#"{"spec": {"containers": [{"name": "a"}, {"name": "b"}]}}"#).unwrap();
/// assert_eq!(evaluate("{.spec.containers[*].name}", &doc).unwrap(), "a b");
/// assert_eq!(evaluate("{.spec.missing}", &doc).unwrap(), "");
/// ```
pub fn evaluate(path: &str, doc: &Value) -> Result<String, EvalError> {
    if !path.contains('{') {
        return render_expression(path, doc);
    }

    let mut out = String::new();
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| invalid(path, "unclosed '{'"))?;
        out.push_str(&render_expression(&after[..close], doc)?);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn render_expression(expr: &str, doc: &Value) -> Result<String, EvalError> {
    let segments = parse_segments(expr)?;
    let mut current: Vec<&Value> = vec![doc];

    for segment in &segments {
        let mut next = Vec::new();
        for value in current {
            select(segment, value, &mut next);
        }
        current = next;
    }

    Ok(current
        .into_iter()
        .filter_map(render_value)
        .collect::<Vec<_>>()
        .join(" "))
}

#[derive(Debug, PartialEq)]
enum Segment {
    Member(String),
    Index(i64),
    Wildcard,
}

fn parse_segments(expr: &str) -> Result<Vec<Segment>, EvalError> {
    let expr = expr.trim();
    let expr = expr.strip_prefix('$').unwrap_or(expr);
    let mut segments = Vec::new();
    let mut chars = expr.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '.' => {
                let start = i + 1;
                let mut end = expr.len();
                while let Some(&(j, next)) = chars.peek() {
                    if next == '.' || next == '[' {
                        end = j;
                        break;
                    }
                    chars.next();
                }
                let name = &expr[start..end];
                match name {
                    "" => {}
                    "*" => segments.push(Segment::Wildcard),
                    _ => segments.push(Segment::Member(name.to_string())),
                }
            }
            '[' => {
                let start = i + 1;
                let close = expr[start..]
                    .find(']')
                    .map(|off| start + off)
                    .ok_or_else(|| invalid(expr, "unclosed '['"))?;
                segments.push(parse_bracket(&expr[start..close], expr)?);
                while let Some(&(j, _)) = chars.peek() {
                    if j > close {
                        break;
                    }
                    chars.next();
                }
            }
            _ if i == 0 => {
                // A leading bare member name, e.g. `metadata.name`.
                let mut end = expr.len();
                while let Some(&(j, next)) = chars.peek() {
                    if next == '.' || next == '[' {
                        end = j;
                        break;
                    }
                    chars.next();
                }
                segments.push(Segment::Member(expr[..end].to_string()));
            }
            _ => return Err(invalid(expr, &format!("unexpected character '{c}'"))),
        }
    }

    Ok(segments)
}

fn parse_bracket(inner: &str, expr: &str) -> Result<Segment, EvalError> {
    let inner = inner.trim();
    if inner == "*" {
        return Ok(Segment::Wildcard);
    }
    for quote in ['\'', '"'] {
        if let Some(name) = inner
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return Ok(Segment::Member(name.to_string()));
        }
    }
    inner
        .parse::<i64>()
        .map(Segment::Index)
        .map_err(|_| invalid(expr, &format!("invalid index '{inner}'")))
}

fn select<'a>(segment: &Segment, value: &'a Value, out: &mut Vec<&'a Value>) {
    match (segment, value) {
        (Segment::Member(name), Value::Object(map)) => out.extend(map.get(name)),
        (Segment::Index(idx), Value::Array(items)) => {
            let len = items.len() as i64;
            let pos = if *idx < 0 { len + idx } else { *idx };
            if (0..len).contains(&pos) {
                out.push(&items[pos as usize]);
            }
        }
        (Segment::Wildcard, Value::Array(items)) => out.extend(items.iter()),
        (Segment::Wildcard, Value::Object(map)) => out.extend(map.values()),
        _ => {}
    }
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn invalid(path: &str, reason: &str) -> EvalError {
    EvalError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
