// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural validation of workflow definitions

use crate::definition::{Action, ActionType, WorkflowDefinition};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl CompileError {
    fn workflow(message: impl Into<String>) -> Self {
        Self { message: message.into(), action: None }
    }

    fn at(action: &str, message: impl Into<String>) -> Self {
        Self {
            message: format!("[{action}] {}", message.into()),
            action: Some(action.to_string()),
        }
    }
}

/// Validation result: `valid` iff `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOutcome {
    pub valid: bool,
    pub errors: Vec<CompileError>,
}

/// Validate a definition's structure.
///
/// Checks triggers/actions presence, `runAfter` references, cycles, known
/// action types, and control-flow shape (loop bounds, retry bodies).
pub fn compile(definition: &WorkflowDefinition) -> CompileOutcome {
    let mut errors = Vec::new();

    if definition.triggers.is_empty() {
        errors.push(CompileError::workflow("Workflow must have at least one trigger"));
    }
    if definition.actions.is_empty() {
        errors.push(CompileError::workflow("Workflow must have at least one action"));
    }

    validate_graph(&definition.actions, &mut errors);

    if detect_cycle(&definition.actions) {
        errors.push(CompileError::workflow("Circular dependency detected in runAfter"));
    }

    CompileOutcome { valid: errors.is_empty(), errors }
}

/// Per-scope validation, applied recursively to nested bodies. `runAfter`
/// references resolve within their own scope only.
fn validate_graph(actions: &IndexMap<String, Action>, errors: &mut Vec<CompileError>) {
    for (name, action) in actions {
        if action.action_type == ActionType::Unknown {
            errors.push(CompileError::at(name, "Unknown action type"));
        }
        for prereq in action.run_after.keys() {
            if !actions.contains_key(prereq) {
                errors.push(CompileError::at(name, format!("Unknown dependency: {prereq}")));
            }
        }
        if action.action_type.is_loop() {
            match &action.limit {
                Some(limit) if limit.count > 0 => {}
                _ => errors.push(CompileError::at(name, "Loop must declare limit.count")),
            }
            if action.condition.is_none() {
                errors.push(CompileError::at(name, "Loop must declare a condition"));
            }
        }
        if action.action_type == ActionType::If && action.condition.is_none() {
            errors.push(CompileError::at(name, "If must declare a condition"));
        }
        if action.action_type == ActionType::Foreach && action.foreach.is_none() {
            errors.push(CompileError::at(name, "Foreach must declare a source sequence"));
        }
        if action.action_type == ActionType::Retry && action.action.is_none() {
            errors.push(CompileError::at(name, "Retry must wrap an action"));
        }

        validate_graph(&action.actions, errors);
        validate_graph(&action.else_actions, errors);
        validate_graph(&action.catch, errors);
        if let Some(inner) = &action.action {
            let mut single = IndexMap::new();
            single.insert(format!("{name}.action"), (**inner).clone());
            validate_graph(&single, errors);
        }
    }
}

/// DFS with an on-stack set per action. Unknown references are reported
/// separately and skipped here.
fn detect_cycle(actions: &IndexMap<String, Action>) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut on_stack: HashSet<&str> = HashSet::new();

    fn visit<'a>(
        name: &'a str,
        actions: &'a IndexMap<String, Action>,
        visited: &mut HashSet<&'a str>,
        on_stack: &mut HashSet<&'a str>,
    ) -> bool {
        if on_stack.contains(name) {
            return true;
        }
        if visited.contains(name) {
            return false;
        }
        visited.insert(name);
        on_stack.insert(name);
        if let Some(action) = actions.get(name) {
            for prereq in action.run_after.keys() {
                if actions.contains_key(prereq.as_str())
                    && visit(prereq, actions, visited, on_stack)
                {
                    return true;
                }
            }
        }
        on_stack.remove(name);
        false
    }

    for name in actions.keys() {
        if visit(name, actions, &mut visited, &mut on_stack) {
            return true;
        }
    }
    // Nested scopes have their own graphs
    actions.values().any(|action| {
        detect_cycle(&action.actions)
            || detect_cycle(&action.else_actions)
            || detect_cycle(&action.catch)
    })
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
