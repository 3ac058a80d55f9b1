// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `@…` expression evaluation
//!
//! Strings beginning with `@` are expressions; everything else passes
//! through untouched. Expressions are function calls with nestable
//! arguments, as in `@greaterOrEquals(@variables('loopIndex'), 4)`, and lookup
//! results accept a trailing `.field` path: `@actions('fetch').output`.

use crate::hosts::SecretsResolver;
use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Regex for the expression head: `@name(`
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static HEAD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@([a-zA-Z_][a-zA-Z0-9_]*)\(").expect("constant regex pattern is valid")
});

/// Lookup scope one expression evaluates against.
pub struct Scope<'a> {
    pub parameters: &'a IndexMap<String, Value>,
    /// Completed action records as JSON (`{status, output, error?}`).
    pub actions: &'a IndexMap<String, Value>,
    pub variables: &'a IndexMap<String, Value>,
    pub secrets: Option<&'a dyn SecretsResolver>,
}

/// Evaluate a (possibly nested) input value. Maps and sequences are walked
/// recursively; non-expression leaves pass through.
pub fn evaluate<'a>(value: &'a Value, scope: &'a Scope<'a>) -> BoxFuture<'a, Result<Value, String>> {
    Box::pin(async move {
        match value {
            Value::String(s) if s.trim_start().starts_with('@') => eval_expression(s.trim(), scope).await,
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(evaluate(item, scope).await?);
                }
                Ok(Value::Array(out))
            }
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(key.clone(), evaluate(item, scope).await?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    })
}

/// Evaluate an expression string to a boolean (loop and `If` conditions).
pub async fn evaluate_condition(value: &Value, scope: &Scope<'_>) -> Result<bool, String> {
    let result = evaluate(value, scope).await?;
    match result {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        other => Err(format!("condition did not evaluate to a boolean: {other}")),
    }
}

fn eval_expression<'a>(expr: &'a str, scope: &'a Scope<'a>) -> BoxFuture<'a, Result<Value, String>> {
    Box::pin(async move {
        let caps = HEAD_PATTERN
            .captures(expr)
            .ok_or_else(|| format!("malformed expression: {expr}"))?;
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let args_start = caps.get(0).map(|m| m.end()).unwrap_or_default();
        let args_end = matching_paren(expr, args_start - 1)
            .ok_or_else(|| format!("unbalanced parentheses: {expr}"))?;
        let inner = &expr[args_start..args_end];
        let path = &expr[args_end + 1..];

        let mut args = Vec::new();
        for raw in split_top_level(inner) {
            args.push(eval_argument(raw.trim(), scope).await?);
        }

        let result = apply(name, &args, scope).await?;
        walk_path(result, path)
    })
}

/// Index of the `)` matching the `(` at `open`.
fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'\'' => in_string = !in_string,
            b'(' if !in_string => depth += 1,
            b')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split arguments at top-level commas, respecting nesting and quotes.
fn split_top_level(s: &str) -> Vec<&str> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut start = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\'' => in_string = !in_string,
            b'(' if !in_string => depth += 1,
            b')' if !in_string => depth = depth.saturating_sub(1),
            b',' if !in_string && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

async fn eval_argument(raw: &str, scope: &Scope<'_>) -> Result<Value, String> {
    if raw.starts_with('@') {
        return eval_expression(raw, scope).await;
    }
    if let Some(stripped) = raw.strip_prefix('\'') {
        let literal = stripped
            .strip_suffix('\'')
            .ok_or_else(|| format!("unterminated string literal: {raw}"))?;
        return Ok(Value::String(literal.to_string()));
    }
    match raw {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(Value::from(n));
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Ok(Value::from(f));
    }
    Err(format!("unrecognized argument: {raw}"))
}

async fn apply(name: &str, args: &[Value], scope: &Scope<'_>) -> Result<Value, String> {
    match name {
        "parameters" => {
            let key = string_arg(name, args)?;
            scope
                .parameters
                .get(&key)
                .cloned()
                .ok_or_else(|| format!("Unknown parameter: {key}"))
        }
        "variables" => {
            let key = string_arg(name, args)?;
            scope
                .variables
                .get(&key)
                .cloned()
                .ok_or_else(|| format!("Unknown variable: {key}"))
        }
        "actions" => {
            let key = string_arg(name, args)?;
            scope
                .actions
                .get(&key)
                .cloned()
                .ok_or_else(|| format!("Unknown action: {key}"))
        }
        "secret" => {
            let key = string_arg(name, args)?;
            let resolver = scope
                .secrets
                .ok_or_else(|| "No secrets client configured".to_string())?;
            resolver.resolve(&key).await.map(Value::String)
        }
        "equals" => {
            let (a, b) = pair(name, args)?;
            Ok(Value::Bool(loose_eq(a, b)))
        }
        "less" => {
            let (a, b) = numeric_pair(name, args)?;
            Ok(Value::Bool(a < b))
        }
        "greaterOrEquals" => {
            let (a, b) = numeric_pair(name, args)?;
            Ok(Value::Bool(a >= b))
        }
        "not" => match args {
            [Value::Bool(b)] => Ok(Value::Bool(!b)),
            [Value::Null] => Ok(Value::Bool(true)),
            _ => Err("not() requires one boolean argument".to_string()),
        },
        other => Err(format!("unknown function: {other}")),
    }
}

fn string_arg(name: &str, args: &[Value]) -> Result<String, String> {
    match args {
        [Value::String(s)] => Ok(s.clone()),
        _ => Err(format!("{name}() requires one string argument")),
    }
}

fn pair<'v>(name: &str, args: &'v [Value]) -> Result<(&'v Value, &'v Value), String> {
    match args {
        [a, b] => Ok((a, b)),
        _ => Err(format!("{name}() requires two arguments")),
    }
}

fn numeric_pair(name: &str, args: &[Value]) -> Result<(f64, f64), String> {
    let (a, b) = pair(name, args)?;
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(format!("{name}() requires numeric arguments, got {a} and {b}")),
    }
}

/// Equality with numeric coercion: `1 == 1.0`.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

/// Walk a trailing `.field.path` into the result. Missing fields resolve to
/// null rather than erroring, so optional outputs stay optional.
fn walk_path(value: Value, path: &str) -> Result<Value, String> {
    if path.is_empty() {
        return Ok(value);
    }
    let mut current = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match &current {
            Value::Object(map) => map.get(segment).cloned().unwrap_or(Value::Null),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Value::Null),
            _ => Value::Null,
        };
    }
    Ok(current)
}

#[cfg(test)]
#[path = "expression_tests.rs"]
mod tests;
