// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow definition wire model
//!
//! Matches the JSON schema clients submit. `$schema` is carried verbatim and
//! never interpreted by the runtime.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal status of one executed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Succeeded,
    Failed,
    Skipped,
    TimedOut,
}

/// Action type tag. Unknown tags deserialize to `Unknown` and are rejected
/// by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Actor,
    Activity,
    #[serde(rename = "AI")]
    Ai,
    Http,
    Compose,
    If,
    Foreach,
    Parallel,
    Scope,
    Until,
    While,
    DoUntil,
    Retry,
    #[serde(other)]
    Unknown,
}

impl ActionType {
    pub fn is_loop(&self) -> bool {
        matches!(self, ActionType::Until | ActionType::While | ActionType::DoUntil)
    }

    /// Types whose nested `actions` map forms a child graph.
    pub fn has_body(&self) -> bool {
        matches!(
            self,
            ActionType::If
                | ActionType::Foreach
                | ActionType::Parallel
                | ActionType::Scope
                | ActionType::Until
                | ActionType::While
                | ActionType::DoUntil
        )
    }
}

/// Hard bounds on a loop action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopLimit {
    /// Hard iteration cap. Mandatory for every loop.
    pub count: u64,
    /// ISO 8601 duration (e.g. "PT30S").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// Pause applied between loop iterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopDelay {
    pub interval: DelayInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayInterval {
    pub count: u64,
    pub unit: DelayUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
}

impl DelayInterval {
    pub fn as_duration(&self) -> std::time::Duration {
        let ms = match self.unit {
            DelayUnit::Millisecond => self.count,
            DelayUnit::Second => self.count * 1_000,
            DelayUnit::Minute => self.count * 60_000,
            DelayUnit::Hour => self.count * 3_600_000,
        };
        std::time::Duration::from_millis(ms)
    }
}

/// Retry shaping for the `Retry` wrapper action. Intervals are ISO 8601
/// durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryActionPolicy {
    #[serde(rename = "type", default = "default_retry_type")]
    pub retry_type: loom_core::Backoff,
    /// Total attempts, including the first.
    #[serde(default = "default_retry_count")]
    pub count: u32,
    #[serde(default = "default_retry_interval")]
    pub interval: String,
    #[serde(rename = "maxInterval", default, skip_serializing_if = "Option::is_none")]
    pub max_interval: Option<String>,
    #[serde(rename = "minimumInterval", default, skip_serializing_if = "Option::is_none")]
    pub minimum_interval: Option<String>,
}

fn default_retry_type() -> loom_core::Backoff {
    loom_core::Backoff::Exponential
}
fn default_retry_count() -> u32 {
    3
}
fn default_retry_interval() -> String {
    "PT1S".to_string()
}

impl Default for RetryActionPolicy {
    fn default() -> Self {
        Self {
            retry_type: default_retry_type(),
            count: default_retry_count(),
            interval: default_retry_interval(),
            max_interval: None,
            minimum_interval: None,
        }
    }
}

/// One node in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub inputs: Value,
    /// Prerequisite action → statuses that allow this action to run.
    #[serde(rename = "runAfter", default, skip_serializing_if = "IndexMap::is_empty")]
    pub run_after: IndexMap<String, Vec<ActionStatus>>,
    /// Condition expression for `If` and loop actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
    /// Nested body for control-flow actions.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub actions: IndexMap<String, Action>,
    /// `If` else-branch.
    #[serde(rename = "else", default, skip_serializing_if = "IndexMap::is_empty")]
    pub else_actions: IndexMap<String, Action>,
    /// `Foreach` source expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreach: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<LoopLimit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<LoopDelay>,
    /// `Scope` error handler.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub catch: IndexMap<String, Action>,
    /// `Retry` policy.
    #[serde(rename = "retryPolicy", default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryActionPolicy>,
    /// `Retry` wrapped action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Box<Action>>,
}

impl Action {
    pub fn new(action_type: ActionType, inputs: Value) -> Self {
        Self {
            action_type,
            inputs,
            run_after: IndexMap::new(),
            condition: None,
            actions: IndexMap::new(),
            else_actions: IndexMap::new(),
            foreach: None,
            limit: None,
            delay: None,
            catch: IndexMap::new(),
            retry_policy: None,
            action: None,
        }
    }

    pub fn run_after(mut self, prereq: impl Into<String>, statuses: &[ActionStatus]) -> Self {
        self.run_after.insert(prereq.into(), statuses.to_vec());
        self
    }
}

/// A complete workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Carried verbatim; clients compare it, the runtime does not interpret
    /// it.
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(rename = "contentVersion", default)]
    pub content_version: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub triggers: IndexMap<String, Value>,
    #[serde(default)]
    pub actions: IndexMap<String, Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Value>,
}

impl WorkflowDefinition {
    pub fn new() -> Self {
        Self {
            schema: None,
            content_version: "1.0.0.0".to_string(),
            parameters: IndexMap::new(),
            triggers: IndexMap::new(),
            actions: IndexMap::new(),
            outputs: None,
        }
    }

    /// Manual trigger stub, enough to satisfy validation.
    pub fn with_manual_trigger(mut self) -> Self {
        self.triggers
            .insert("manual".to_string(), serde_json::json!({"type": "Request"}));
        self
    }

    pub fn with_action(mut self, name: impl Into<String>, action: Action) -> Self {
        self.actions.insert(name.into(), action);
        self
    }
}

impl Default for WorkflowDefinition {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
