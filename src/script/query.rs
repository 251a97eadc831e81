//! jq-style queries over in-memory data.
//!
//! Supported subset: identity `.`, field access `.a.b` with optional `?`,
//! array index `.[0]` (negative indexes from the end), iteration `.[]`
//! over arrays and object values, and pipes. Each query returns the list
//! of values it produces.

use crate::error::{Error, Result};
use serde_json::Value;

#[derive(Debug, PartialEq)]
enum Step {
    Field { name: String, optional: bool },
    Index(i64),
    Iterate,
}

/// Evaluate `query` against `data`.
pub fn run(query: &str, data: &Value) -> Result<Vec<Value>> {
    let steps = parse(query)?;
    let mut current = vec![data.clone()];
    for step in &steps {
        let mut next = Vec::new();
        for value in &current {
            apply(step, value, &mut next)?;
        }
        current = next;
    }
    Ok(current)
}

fn query_err(query: &str, message: impl Into<String>) -> Error {
    Error::Script {
        message: format!("query {query:?}: {}", message.into()),
    }
}

fn parse(query: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for segment in query.split('|') {
        let segment = segment.trim();
        if !segment.starts_with('.') {
            return Err(query_err(query, "segments must start with '.'"));
        }
        let mut rest = &segment[1..];
        loop {
            if rest.is_empty() {
                break;
            }
            if let Some(tail) = rest.strip_prefix('.') {
                rest = tail;
                continue;
            }
            if let Some(tail) = rest.strip_prefix('[') {
                let close = tail
                    .find(']')
                    .ok_or_else(|| query_err(query, "unclosed '['"))?;
                let inner = tail[..close].trim();
                if inner.is_empty() {
                    steps.push(Step::Iterate);
                } else {
                    let index: i64 = inner
                        .parse()
                        .map_err(|_| query_err(query, format!("invalid index {inner:?}")))?;
                    steps.push(Step::Index(index));
                }
                rest = &tail[close + 1..];
                continue;
            }
            let end = rest
                .find(|c: char| c == '.' || c == '[' || c == '?')
                .unwrap_or(rest.len());
            if end == 0 {
                return Err(query_err(query, format!("unexpected token at {rest:?}")));
            }
            let name = rest[..end].to_string();
            if !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(query_err(query, format!("invalid field name {name:?}")));
            }
            rest = &rest[end..];
            let optional = rest.starts_with('?');
            if optional {
                rest = &rest[1..];
            }
            steps.push(Step::Field { name, optional });
        }
    }
    Ok(steps)
}

fn apply(step: &Step, value: &Value, out: &mut Vec<Value>) -> Result<()> {
    match step {
        Step::Field { name, optional } => match value {
            Value::Object(map) => out.push(map.get(name).cloned().unwrap_or(Value::Null)),
            Value::Null => out.push(Value::Null),
            other => {
                if !optional {
                    return Err(Error::Script {
                        message: format!("cannot index {} with {name:?}", kind(other)),
                    });
                }
            }
        },
        Step::Index(index) => match value {
            Value::Array(items) => {
                let len = items.len() as i64;
                let at = if *index < 0 { len + index } else { *index };
                if at >= 0 && at < len {
                    out.push(items[at as usize].clone());
                } else {
                    out.push(Value::Null);
                }
            }
            Value::Null => out.push(Value::Null),
            other => {
                return Err(Error::Script {
                    message: format!("cannot index {} with a number", kind(other)),
                })
            }
        },
        Step::Iterate => match value {
            Value::Array(items) => out.extend(items.iter().cloned()),
            Value::Object(map) => out.extend(map.values().cloned()),
            other => {
                return Err(Error::Script {
                    message: format!("cannot iterate over {}", kind(other)),
                })
            }
        },
    }
    Ok(())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
