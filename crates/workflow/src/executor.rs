// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow executor
//!
//! Greedy ready-set traversal over the action graph: a pass executes every
//! action whose `runAfter` prerequisites are recorded with an allowed
//! status, records results, and repeats until the graph is done or no pass
//! makes progress. Control-flow actions run their nested graphs with scoped
//! variable bindings so nested loops stay independent.

use crate::compiler::compile;
use crate::definition::{
    Action, ActionStatus, ActionType, LoopLimit, RetryActionPolicy, WorkflowDefinition,
};
use crate::duration::parse_iso8601_duration;
use crate::error::WorkflowError;
use crate::expression::{evaluate, evaluate_condition, Scope};
use crate::hosts::{ActivityHost, ActorDispatcher, SecretsResolver};
use futures_util::future::join_all;
use indexmap::IndexMap;
use loom_core::{calculate_retry_delay, Backoff, Clock, InstanceId, RetryPolicy, WorkflowId};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Result of one executed action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub status: ActionStatus,
    pub output: Value,
    pub error: Option<String>,
}

impl ActionRecord {
    fn succeeded(output: Value) -> Self {
        Self { status: ActionStatus::Succeeded, output, error: None }
    }

    fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self { status: ActionStatus::Failed, output: Value::Null, error: Some(error) }
    }

    fn timed_out(error: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::TimedOut,
            output: Value::Null,
            error: Some(error.into()),
        }
    }

    fn skipped() -> Self {
        Self { status: ActionStatus::Skipped, output: Value::Null, error: None }
    }

    /// Expression-visible view: `@actions('x').<field>`.
    pub fn as_value(&self) -> Value {
        let mut value = json!({
            "status": self.status,
            "output": self.output,
        });
        if let Some(error) = &self.error {
            value["error"] = json!(error);
        }
        value
    }
}

/// Mutable state of one workflow run.
#[derive(Debug)]
pub struct WorkflowInstance {
    pub workflow_id: WorkflowId,
    pub instance_id: InstanceId,
    pub parameters: IndexMap<String, Value>,
    pub actions: IndexMap<String, ActionRecord>,
    pub variables: IndexMap<String, Value>,
}

impl WorkflowInstance {
    fn action_values(&self) -> IndexMap<String, Value> {
        self.actions
            .iter()
            .map(|(name, record)| (name.clone(), record.as_value()))
            .collect()
    }
}

/// A finished run: the instance plus evaluated `outputs`.
#[derive(Debug)]
pub struct WorkflowRun {
    pub instance: WorkflowInstance,
    pub outputs: Option<Value>,
}

enum Readiness {
    Ready,
    Blocked,
    Skip,
}

/// Executes compiled workflow definitions against the host seams.
pub struct WorkflowExecutor<C> {
    dispatcher: Option<Arc<dyn ActorDispatcher>>,
    activities: Option<Arc<dyn ActivityHost>>,
    secrets: Option<Arc<dyn SecretsResolver>>,
    http: reqwest::Client,
    clock: C,
}

impl<C: Clock> WorkflowExecutor<C> {
    pub fn new(clock: C) -> Self {
        Self {
            dispatcher: None,
            activities: None,
            secrets: None,
            http: reqwest::Client::new(),
            clock,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn ActorDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn with_activities(mut self, activities: Arc<dyn ActivityHost>) -> Self {
        self.activities = Some(activities);
        self
    }

    pub fn with_secrets(mut self, secrets: Arc<dyn SecretsResolver>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    /// Run a definition to completion.
    pub async fn run(
        &self,
        workflow_id: impl Into<WorkflowId>,
        definition: &WorkflowDefinition,
        parameters: IndexMap<String, Value>,
    ) -> Result<WorkflowRun, WorkflowError> {
        let outcome = compile(definition);
        if !outcome.valid {
            return Err(WorkflowError::Invalid(outcome.errors));
        }

        let mut instance = WorkflowInstance {
            workflow_id: workflow_id.into(),
            instance_id: InstanceId::new(),
            parameters: resolve_parameters(definition, parameters),
            actions: IndexMap::new(),
            variables: IndexMap::new(),
        };
        tracing::info!(
            workflow = %instance.workflow_id,
            instance = %instance.instance_id,
            actions = definition.actions.len(),
            "workflow started"
        );

        self.run_graph(&definition.actions, &mut instance).await?;

        if let Some((name, error)) = unhandled_failure(&definition.actions, &instance) {
            tracing::warn!(workflow = %instance.workflow_id, action = %name, error = %error, "workflow failed");
            return Err(WorkflowError::ActionFailed { name, message: error });
        }

        let outputs = match &definition.outputs {
            Some(outputs) => Some(
                self.eval(outputs, &instance)
                    .await
                    .map_err(WorkflowError::Expression)?,
            ),
            None => None,
        };
        tracing::info!(workflow = %instance.workflow_id, instance = %instance.instance_id, "workflow completed");
        Ok(WorkflowRun { instance, outputs })
    }

    async fn eval(&self, value: &Value, instance: &WorkflowInstance) -> Result<Value, String> {
        let actions = instance.action_values();
        let scope = Scope {
            parameters: &instance.parameters,
            actions: &actions,
            variables: &instance.variables,
            secrets: self.secrets.as_deref(),
        };
        evaluate(value, &scope).await
    }

    async fn eval_condition(
        &self,
        value: &Value,
        instance: &WorkflowInstance,
    ) -> Result<bool, String> {
        let actions = instance.action_values();
        let scope = Scope {
            parameters: &instance.parameters,
            actions: &actions,
            variables: &instance.variables,
            secrets: self.secrets.as_deref(),
        };
        evaluate_condition(value, &scope).await
    }

    /// One scope's greedy traversal. Fails only on a wedged graph; action
    /// failures are recorded and judged by dependents (and at the end of
    /// the run).
    async fn run_graph(
        &self,
        actions: &IndexMap<String, Action>,
        instance: &mut WorkflowInstance,
    ) -> Result<(), WorkflowError> {
        loop {
            let mut progressed = false;
            for (name, action) in actions {
                if instance.actions.contains_key(name) {
                    continue;
                }
                match readiness(action, instance) {
                    Readiness::Blocked => {}
                    Readiness::Skip => {
                        instance.actions.insert(name.clone(), ActionRecord::skipped());
                        progressed = true;
                    }
                    Readiness::Ready => {
                        let record = Box::pin(self.execute_action(name, action, instance)).await;
                        tracing::debug!(
                            action = %name,
                            status = ?record.status,
                            "action finished"
                        );
                        instance.actions.insert(name.clone(), record);
                        progressed = true;
                    }
                }
            }
            let done = actions.keys().all(|name| instance.actions.contains_key(name));
            if done {
                return Ok(());
            }
            if !progressed {
                return Err(WorkflowError::NoProgress);
            }
        }
    }

    async fn execute_action(
        &self,
        name: &str,
        action: &Action,
        instance: &mut WorkflowInstance,
    ) -> ActionRecord {
        match action.action_type {
            ActionType::Compose => match self.eval(&action.inputs, instance).await {
                Ok(output) => ActionRecord::succeeded(output),
                Err(e) => ActionRecord::failed(e),
            },
            ActionType::Http => self.execute_http(action, instance).await,
            ActionType::Actor => self.execute_actor(action, instance).await,
            ActionType::Ai => self.execute_ai(action, instance).await,
            ActionType::Activity => self.execute_activity(action, instance).await,
            ActionType::If => self.execute_if(action, instance).await,
            ActionType::Foreach => self.execute_foreach(name, action, instance).await,
            ActionType::Parallel => self.execute_parallel(action, instance).await,
            ActionType::Scope => self.execute_scope(action, instance).await,
            ActionType::Until | ActionType::While | ActionType::DoUntil => {
                self.execute_loop(action, instance).await
            }
            ActionType::Retry => self.execute_retry(name, action, instance).await,
            ActionType::Unknown => ActionRecord::failed("Unknown action type"),
        }
    }

    async fn execute_http(&self, action: &Action, instance: &WorkflowInstance) -> ActionRecord {
        let inputs = match self.eval(&action.inputs, instance).await {
            Ok(inputs) => inputs,
            Err(e) => return ActionRecord::failed(e),
        };
        let url = match inputs.get("url").or_else(|| inputs.get("uri")).and_then(Value::as_str) {
            Some(url) => url.to_string(),
            None => return ActionRecord::failed("Http action requires a url"),
        };
        let method = inputs.get("method").and_then(Value::as_str).unwrap_or("GET");
        let method = match reqwest::Method::from_bytes(method.to_uppercase().as_bytes()) {
            Ok(method) => method,
            Err(_) => return ActionRecord::failed(format!("invalid HTTP method: {method}")),
        };

        let mut request = self.http.request(method, &url);
        if let Some(headers) = inputs.get("headers").and_then(Value::as_object) {
            for (key, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(key, value);
                }
            }
        }
        if let Some(body) = inputs.get("body") {
            request = request.json(body);
        }
        if let Some(timeout) = inputs.get("timeout").and_then(Value::as_str) {
            match parse_iso8601_duration(timeout) {
                Ok(timeout) => request = request.timeout(timeout),
                Err(e) => return ActionRecord::failed(e),
            }
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let headers: serde_json::Map<String, Value> = response
                    .headers()
                    .iter()
                    .map(|(k, v)| {
                        (k.to_string(), json!(v.to_str().unwrap_or_default()))
                    })
                    .collect();
                let text = response.text().await.unwrap_or_default();
                let body =
                    serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
                ActionRecord::succeeded(json!({
                    "status": status,
                    "headers": headers,
                    "body": body,
                }))
            }
            Err(e) if e.is_timeout() => ActionRecord::timed_out(format!("HTTP request timed out: {url}")),
            Err(e) => ActionRecord::failed(format!("HTTP request failed: {e}")),
        }
    }

    async fn execute_actor(&self, action: &Action, instance: &WorkflowInstance) -> ActionRecord {
        let inputs = match self.eval(&action.inputs, instance).await {
            Ok(inputs) => inputs,
            Err(e) => return ActionRecord::failed(e),
        };
        let Some(dispatcher) = &self.dispatcher else {
            return ActionRecord::failed("No actor dispatcher configured");
        };
        let Some(actor_type) = inputs.get("actorType").and_then(Value::as_str) else {
            return ActionRecord::failed("Actor action requires actorType");
        };
        let actor_id = inputs
            .get("actorId")
            .and_then(Value::as_str)
            .map(loom_core::ActorId::new);
        let method = inputs.get("method").and_then(Value::as_str).unwrap_or("handle");
        let args = inputs.get("args").cloned().unwrap_or(Value::Null);

        match dispatcher
            .dispatch(&loom_core::ActorType::new(actor_type), actor_id.as_ref(), method, args)
            .await
        {
            Ok(output) => ActionRecord::succeeded(output),
            Err(e) => ActionRecord::failed(e),
        }
    }

    async fn execute_ai(&self, action: &Action, instance: &WorkflowInstance) -> ActionRecord {
        let inputs = match self.eval(&action.inputs, instance).await {
            Ok(inputs) => inputs,
            Err(e) => return ActionRecord::failed(e),
        };
        let Some(dispatcher) = &self.dispatcher else {
            return ActionRecord::failed("No actor dispatcher configured");
        };
        // AI actions are sugar for dispatching to an AIAgent actor.
        let args = json!({
            "message": inputs.get("message").cloned().unwrap_or(Value::Null),
            "systemPrompt": inputs.get("systemPrompt").cloned().unwrap_or(Value::Null),
            "temperature": inputs.get("temperature").cloned().unwrap_or(Value::Null),
            "model": inputs.get("model").cloned().unwrap_or(Value::Null),
        });
        match dispatcher
            .dispatch(&loom_core::ActorType::new("AIAgent"), None, "chat", args)
            .await
        {
            Ok(output) => ActionRecord::succeeded(output),
            Err(e) => ActionRecord::failed(e),
        }
    }

    async fn execute_activity(&self, action: &Action, instance: &WorkflowInstance) -> ActionRecord {
        let inputs = match self.eval(&action.inputs, instance).await {
            Ok(inputs) => inputs,
            Err(e) => return ActionRecord::failed(e),
        };
        let Some(activities) = &self.activities else {
            return ActionRecord::failed("No activity host configured");
        };
        let Some(activity_name) = inputs
            .get("name")
            .or_else(|| inputs.get("activity"))
            .and_then(Value::as_str)
        else {
            return ActionRecord::failed("Activity action requires a name");
        };
        let input = inputs.get("input").cloned().unwrap_or(Value::Null);

        let run = activities.run(activity_name, input);
        let result = match inputs.get("timeout").and_then(Value::as_str) {
            Some(timeout) => {
                let timeout = match parse_iso8601_duration(timeout) {
                    Ok(timeout) => timeout,
                    Err(e) => return ActionRecord::failed(e),
                };
                match tokio::time::timeout(timeout, run).await {
                    Ok(result) => result,
                    Err(_) => {
                        return ActionRecord::timed_out(format!(
                            "activity '{activity_name}' timed out"
                        ))
                    }
                }
            }
            None => run.await,
        };
        match result {
            Ok(output) => ActionRecord::succeeded(output),
            Err(e) => ActionRecord::failed(e),
        }
    }

    async fn execute_if(&self, action: &Action, instance: &mut WorkflowInstance) -> ActionRecord {
        let Some(condition) = &action.condition else {
            return ActionRecord::failed("If must declare a condition");
        };
        let condition_result = match self.eval_condition(condition, instance).await {
            Ok(result) => result,
            Err(e) => return ActionRecord::failed(e),
        };
        let branch = if condition_result { &action.actions } else { &action.else_actions };

        let results = match self.run_branch(branch, instance).await {
            Ok(results) => results,
            Err(record) => return record,
        };
        ActionRecord::succeeded(json!({
            "conditionResult": condition_result,
            "results": results,
        }))
    }

    async fn execute_scope(&self, action: &Action, instance: &mut WorkflowInstance) -> ActionRecord {
        match self.run_branch(&action.actions, instance).await {
            Ok(results) => ActionRecord::succeeded(json!({
                "status": "succeeded",
                "results": results,
            })),
            Err(failure) => {
                let error = failure.error.clone().unwrap_or_else(|| "scope failed".to_string());
                if action.catch.is_empty() {
                    return failure;
                }
                // The catch block sees the triggering error as a variable.
                let saved = bind(&mut instance.variables, "error", json!({"message": error}));
                let caught = self.run_branch(&action.catch, instance).await;
                restore(&mut instance.variables, "error", saved);
                match caught {
                    Ok(results) => ActionRecord::succeeded(json!({
                        "status": "caught",
                        "error": error,
                        "results": results,
                    })),
                    Err(catch_failure) => catch_failure,
                }
            }
        }
    }

    /// Run a nested graph; on unhandled failure, roll it up into a record.
    /// Child records stay visible in `instance.actions` for expressions.
    async fn run_branch(
        &self,
        actions: &IndexMap<String, Action>,
        instance: &mut WorkflowInstance,
    ) -> Result<Value, ActionRecord> {
        clear_records(actions, instance);
        if let Err(e) = self.run_graph(actions, instance).await {
            return Err(ActionRecord::failed(e.to_string()));
        }
        if let Some((name, error)) = unhandled_failure(actions, instance) {
            return Err(ActionRecord::failed(format!("{name}: {error}")));
        }
        let results: serde_json::Map<String, Value> = actions
            .keys()
            .filter_map(|name| {
                instance
                    .actions
                    .get(name)
                    .map(|record| (name.clone(), record.as_value()))
            })
            .collect();
        Ok(Value::Object(results))
    }

    async fn execute_foreach(
        &self,
        name: &str,
        action: &Action,
        instance: &mut WorkflowInstance,
    ) -> ActionRecord {
        let Some(source) = &action.foreach else {
            return ActionRecord::failed("Foreach must declare a source sequence");
        };
        let items = match self.eval(source, instance).await {
            Ok(Value::Array(items)) => items,
            Ok(other) => {
                return ActionRecord::failed(format!(
                    "Foreach source did not evaluate to a sequence: {other}"
                ))
            }
            Err(e) => return ActionRecord::failed(e),
        };

        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let saved_item = bind(&mut instance.variables, "item", item);
            let iteration = self.run_branch(&action.actions, instance).await;
            restore(&mut instance.variables, "item", saved_item);
            match iteration {
                Ok(value) => results.push(value),
                Err(failure) => {
                    let error = failure.error.unwrap_or_default();
                    return ActionRecord::failed(format!(
                        "{name} failed at item {index}: {error}"
                    ));
                }
            }
        }
        ActionRecord::succeeded(Value::Array(results))
    }

    async fn execute_parallel(&self, action: &Action, instance: &mut WorkflowInstance) -> ActionRecord {
        // Children run concurrently against a snapshot of the pre-parallel
        // scope; records land after all branches settle.
        clear_records(&action.actions, instance);
        let settled = {
            let snapshot: &WorkflowInstance = instance;
            let futures: Vec<_> = action
                .actions
                .iter()
                .map(|(child_name, child)| async move {
                    let record = match child.action_type {
                        // Nested graphs need the mutable instance; inside
                        // Parallel, branches are leaf actions evaluated on
                        // the snapshot.
                        ActionType::Compose
                        | ActionType::Http
                        | ActionType::Actor
                        | ActionType::Ai
                        | ActionType::Activity => self.execute_leaf(child, snapshot).await,
                        _ => ActionRecord::failed(
                            "Parallel branches must be leaf actions; wrap nested flows in a Scope",
                        ),
                    };
                    (child_name.clone(), record)
                })
                .collect();
            join_all(futures).await
        };

        let mut output = serde_json::Map::new();
        let mut first_error: Option<String> = None;
        let mut records = Vec::new();
        for (child_name, record) in settled {
            if record.status == ActionStatus::Failed && first_error.is_none() {
                first_error = Some(format!(
                    "{child_name}: {}",
                    record.error.clone().unwrap_or_default()
                ));
            }
            output.insert(child_name.clone(), record.output.clone());
            records.push((child_name, record));
        }
        for (child_name, record) in records {
            instance.actions.insert(child_name, record);
        }
        match first_error {
            Some(error) => ActionRecord::failed(error),
            None => ActionRecord::succeeded(Value::Object(output)),
        }
    }

    /// Leaf dispatch against an immutable instance (used by Parallel).
    async fn execute_leaf(&self, action: &Action, instance: &WorkflowInstance) -> ActionRecord {
        match action.action_type {
            ActionType::Compose => match self.eval(&action.inputs, instance).await {
                Ok(output) => ActionRecord::succeeded(output),
                Err(e) => ActionRecord::failed(e),
            },
            ActionType::Http => self.execute_http(action, instance).await,
            ActionType::Actor => self.execute_actor(action, instance).await,
            ActionType::Ai => self.execute_ai(action, instance).await,
            ActionType::Activity => self.execute_activity(action, instance).await,
            _ => ActionRecord::failed("not a leaf action"),
        }
    }

    async fn execute_loop(&self, action: &Action, instance: &mut WorkflowInstance) -> ActionRecord {
        let Some(LoopLimit { count: limit_count, timeout }) = action.limit.clone() else {
            return ActionRecord::failed("Loop must declare limit.count");
        };
        let Some(condition) = action.condition.clone() else {
            return ActionRecord::failed("Loop must declare a condition");
        };
        let deadline = match timeout.as_deref().map(parse_iso8601_duration) {
            Some(Ok(timeout)) => Some(self.clock.now() + timeout),
            Some(Err(e)) => return ActionRecord::failed(e),
            None => None,
        };
        let kind = action.action_type;

        // Loop context is a per-iteration scope layered over instance
        // variables; nesting restores the outer loop's bindings on exit.
        let saved_index = bind(&mut instance.variables, "loopIndex", json!(0));
        let saved_count = bind(&mut instance.variables, "loopCount", json!(1));

        let mut iterations: u64 = 0;
        let mut results = Vec::new();
        let mut condition_met = false;
        let mut error: Option<String> = None;
        let status = loop {
            if kind == ActionType::While {
                match self.eval_condition(&condition, instance).await {
                    Ok(true) => {}
                    Ok(false) => {
                        condition_met = true;
                        break "completed";
                    }
                    Err(e) => {
                        error = Some(e);
                        break "failed";
                    }
                }
            }

            match self.run_branch(&action.actions, instance).await {
                Ok(value) => results.push(value),
                Err(failure) => {
                    error = failure.error;
                    break "failed";
                }
            }
            iterations += 1;
            instance.variables.insert("loopIndex".to_string(), json!(iterations));
            instance.variables.insert("loopCount".to_string(), json!(iterations + 1));

            if matches!(kind, ActionType::Until | ActionType::DoUntil) {
                match self.eval_condition(&condition, instance).await {
                    Ok(true) => {
                        condition_met = true;
                        break "completed";
                    }
                    Ok(false) => {}
                    Err(e) => {
                        error = Some(e);
                        break "failed";
                    }
                }
            }
            if iterations >= limit_count {
                break "max-iterations";
            }
            if deadline.is_some_and(|d| self.clock.now() >= d) {
                break "timeout";
            }
            if let Some(delay) = &action.delay {
                tokio::time::sleep(delay.interval.as_duration()).await;
            }
        };

        restore(&mut instance.variables, "loopIndex", saved_index);
        restore(&mut instance.variables, "loopCount", saved_count);

        let mut output = json!({
            "status": status,
            "iterations": iterations,
            "results": results,
        });
        if status == "completed" {
            output["conditionMet"] = json!(condition_met);
        }
        match status {
            "failed" => ActionRecord {
                status: ActionStatus::Failed,
                output,
                error: error.or_else(|| Some("loop body failed".to_string())),
            },
            "timeout" => ActionRecord {
                status: ActionStatus::TimedOut,
                output,
                error: Some("loop exceeded limit.timeout".to_string()),
            },
            _ => ActionRecord::succeeded(output),
        }
    }

    async fn execute_retry(
        &self,
        name: &str,
        action: &Action,
        instance: &mut WorkflowInstance,
    ) -> ActionRecord {
        let Some(inner) = &action.action else {
            return ActionRecord::failed("Retry must wrap an action");
        };
        let policy = action.retry_policy.clone().unwrap_or_default();
        let retry_policy = match to_retry_policy(&policy) {
            Ok(retry_policy) => retry_policy,
            Err(e) => return ActionRecord::failed(e),
        };
        let minimum = match policy.minimum_interval.as_deref().map(parse_iso8601_duration) {
            Some(Ok(minimum)) => Some(minimum),
            Some(Err(e)) => return ActionRecord::failed(e),
            None => None,
        };

        let max_attempts = retry_policy.max_attempts.max(1);
        let mut last = ActionRecord::failed("retry never ran");
        for attempt in 1..=max_attempts {
            last = Box::pin(self.execute_action(&format!("{name}.action"), inner, instance)).await;
            if last.status != ActionStatus::Failed && last.status != ActionStatus::TimedOut {
                return ActionRecord::succeeded(json!({
                    "attempts": attempt,
                    "output": last.output,
                }));
            }
            if attempt < max_attempts {
                let mut delay = calculate_retry_delay(&retry_policy, attempt);
                if let Some(minimum) = minimum {
                    delay = delay.max(minimum);
                }
                tracing::debug!(action = %name, attempt, delay_ms = delay.as_millis() as u64, "retrying");
                tokio::time::sleep(delay).await;
            }
        }
        ActionRecord {
            status: last.status,
            output: Value::Null,
            error: Some(format!(
                "exhausted {max_attempts} attempts: {}",
                last.error.unwrap_or_default()
            )),
        }
    }
}

/// Map the wire retry policy onto the shared backoff calculator.
fn to_retry_policy(policy: &RetryActionPolicy) -> Result<RetryPolicy, String> {
    let initial = parse_iso8601_duration(&policy.interval)?;
    let max = match policy.max_interval.as_deref() {
        Some(max_interval) => parse_iso8601_duration(max_interval)?,
        None => Duration::from_secs(3600),
    };
    Ok(RetryPolicy {
        max_attempts: policy.count,
        backoff: policy.retry_type,
        initial_delay_ms: initial.as_millis() as u64,
        max_delay_ms: max.as_millis() as u64,
        multiplier: match policy.retry_type {
            Backoff::Exponential => 2.0,
            _ => 1.0,
        },
    })
}

fn resolve_parameters(
    definition: &WorkflowDefinition,
    provided: IndexMap<String, Value>,
) -> IndexMap<String, Value> {
    let mut parameters = IndexMap::new();
    for (name, spec) in &definition.parameters {
        // Definitions may carry `{type, defaultValue}` bags or raw defaults.
        let default = spec.get("defaultValue").cloned().unwrap_or_else(|| spec.clone());
        parameters.insert(name.clone(), default);
    }
    for (name, value) in provided {
        parameters.insert(name, value);
    }
    parameters
}

fn readiness(action: &Action, instance: &WorkflowInstance) -> Readiness {
    for (prereq, allowed) in &action.run_after {
        let Some(record) = instance.actions.get(prereq) else {
            return Readiness::Blocked;
        };
        let allowed = if allowed.is_empty() {
            &[ActionStatus::Succeeded][..]
        } else {
            allowed.as_slice()
        };
        if !allowed.contains(&record.status) {
            return Readiness::Skip;
        }
    }
    Readiness::Ready
}

/// The first recorded failure in this scope that no sibling tolerates via
/// `runAfter`.
fn unhandled_failure(
    actions: &IndexMap<String, Action>,
    instance: &WorkflowInstance,
) -> Option<(String, String)> {
    for name in actions.keys() {
        let Some(record) = instance.actions.get(name) else {
            continue;
        };
        if !matches!(record.status, ActionStatus::Failed | ActionStatus::TimedOut) {
            continue;
        }
        let handled = actions.values().any(|other| {
            other
                .run_after
                .get(name)
                .is_some_and(|allowed| allowed.contains(&record.status))
        });
        if !handled {
            return Some((
                name.clone(),
                record.error.clone().unwrap_or_else(|| "action failed".to_string()),
            ));
        }
    }
    None
}

/// Drop stale records for a nested graph so re-entry (loop iterations,
/// branch retries) re-executes it.
fn clear_records(actions: &IndexMap<String, Action>, instance: &mut WorkflowInstance) {
    for name in actions.keys() {
        instance.actions.shift_remove(name);
    }
}

fn bind(variables: &mut IndexMap<String, Value>, key: &str, value: Value) -> Option<Value> {
    variables.insert(key.to_string(), value)
}

fn restore(variables: &mut IndexMap<String, Value>, key: &str, saved: Option<Value>) {
    match saved {
        Some(value) => {
            variables.insert(key.to_string(), value);
        }
        None => {
            variables.shift_remove(key);
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
