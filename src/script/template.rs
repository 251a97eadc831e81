//! Text-template evaluation for the script library.
//!
//! Supports the template dialect pack scripts use: `{{.path.to.field}}`
//! interpolation, `{{range .list}}…{{end}}` iteration rebinding the dot,
//! `{{if .cond}}…{{else}}…{{end}}` branching, `{{.}}` for the current
//! value, and configurable delimiters. Anything else is an error.

use crate::error::{Error, Result};
use serde_json::Value;

#[derive(Debug)]
enum Node {
    Text(String),
    Field(Vec<String>),
    Range {
        path: Vec<String>,
        body: Vec<Node>,
    },
    If {
        path: Vec<String>,
        then_body: Vec<Node>,
        else_body: Vec<Node>,
    },
}

/// Render `tmpl` against `data` with the given delimiters.
pub fn render(tmpl: &str, data: &Value, left: &str, right: &str) -> Result<String> {
    let (left, right) = if left.is_empty() || right.is_empty() {
        ("{{", "}}")
    } else {
        (left, right)
    };
    let nodes = parse(tmpl, left, right)?;
    let mut out = String::new();
    render_nodes(&nodes, data, &mut out)?;
    Ok(out)
}

fn template_err(message: impl Into<String>) -> Error {
    Error::Script {
        message: message.into(),
    }
}

fn parse(tmpl: &str, left: &str, right: &str) -> Result<Vec<Node>> {
    let mut actions = Vec::new();
    let mut rest = tmpl;
    while let Some(start) = rest.find(left) {
        let (text, after) = rest.split_at(start);
        if !text.is_empty() {
            actions.push(Action::Text(text.to_string()));
        }
        let after = &after[left.len()..];
        let end = after
            .find(right)
            .ok_or_else(|| template_err(format!("unclosed {left} in template")))?;
        actions.push(parse_action(after[..end].trim())?);
        rest = &after[end + right.len()..];
    }
    if !rest.is_empty() {
        actions.push(Action::Text(rest.to_string()));
    }
    build_tree(&mut actions.into_iter(), false, None)
}

enum Action {
    Text(String),
    Field(Vec<String>),
    Range(Vec<String>),
    If(Vec<String>),
    Else,
    End,
}

fn parse_action(token: &str) -> Result<Action> {
    if token == "end" {
        return Ok(Action::End);
    }
    if token == "else" {
        return Ok(Action::Else);
    }
    if let Some(path) = token.strip_prefix("range ") {
        return Ok(Action::Range(parse_path(path.trim())?));
    }
    if let Some(path) = token.strip_prefix("if ") {
        return Ok(Action::If(parse_path(path.trim())?));
    }
    if token.starts_with('.') {
        return Ok(Action::Field(parse_path(token)?));
    }
    Err(template_err(format!("unsupported template action {token:?}")))
}

fn parse_path(token: &str) -> Result<Vec<String>> {
    let tail = token
        .strip_prefix('.')
        .ok_or_else(|| template_err(format!("expected a dot path, got {token:?}")))?;
    if tail.is_empty() {
        return Ok(Vec::new());
    }
    let mut path = Vec::new();
    for part in tail.split('.') {
        if part.is_empty()
            || !part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(template_err(format!("invalid field path {token:?}")));
        }
        path.push(part.to_string());
    }
    Ok(path)
}

/// Assemble the flat action list into a tree, recursing at `range`/`if`.
fn build_tree(
    actions: &mut dyn Iterator<Item = Action>,
    nested: bool,
    mut else_slot: Option<&mut Vec<Node>>,
) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    while let Some(action) = actions.next() {
        match action {
            Action::Text(text) => nodes.push(Node::Text(text)),
            Action::Field(path) => nodes.push(Node::Field(path)),
            Action::Range(path) => {
                let body = build_tree(actions, true, None)?;
                nodes.push(Node::Range { path, body });
            }
            Action::If(path) => {
                let mut else_body = Vec::new();
                let then_body = build_tree(actions, true, Some(&mut else_body))?;
                nodes.push(Node::If {
                    path,
                    then_body,
                    else_body,
                });
            }
            Action::Else => match else_slot.take() {
                Some(slot) => {
                    *slot = build_tree(actions, true, None)?;
                    return Ok(nodes);
                }
                None => return Err(template_err("unexpected else action")),
            },
            Action::End => {
                if nested {
                    return Ok(nodes);
                }
                return Err(template_err("unexpected end action"));
            }
        }
    }
    if nested {
        return Err(template_err("unclosed block, missing end action"));
    }
    Ok(nodes)
}

fn render_nodes(nodes: &[Node], dot: &Value, out: &mut String) -> Result<()> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Field(path) => out.push_str(&render_value(lookup(dot, path)?)?),
            Node::Range { path, body } => match lookup(dot, path)? {
                Value::Array(items) => {
                    for item in items {
                        render_nodes(body, item, out)?;
                    }
                }
                Value::Null => {}
                other => {
                    return Err(template_err(format!(
                        "range requires a list, got {}",
                        type_name(other)
                    )))
                }
            },
            Node::If {
                path,
                then_body,
                else_body,
            } => {
                let branch = if is_truthy(lookup(dot, path)?) {
                    then_body
                } else {
                    else_body
                };
                render_nodes(branch, dot, out)?;
            }
        }
    }
    Ok(())
}

fn lookup<'v>(dot: &'v Value, path: &[String]) -> Result<&'v Value> {
    let mut current = dot;
    for part in path {
        current = match current {
            Value::Object(map) => map
                .get(part)
                .ok_or_else(|| template_err(format!("no field {part:?} in data")))?,
            other => {
                return Err(template_err(format!(
                    "cannot access field {part:?} on {}",
                    type_name(other)
                )))
            }
        };
    }
    Ok(current)
}

fn render_value(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok("<no value>".to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(render_number(n)),
        Value::String(s) => Ok(s.clone()),
        other => Err(template_err(format!(
            "cannot render {} directly",
            type_name(other)
        ))),
    }
}

fn render_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(f) = n.as_f64() {
        if f.fract() == 0.0 && f.is_finite() {
            return format!("{}", f as i64);
        }
    }
    n.to_string()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
