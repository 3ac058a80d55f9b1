// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow → actor dispatch seam
//!
//! Implements the workflow executor's [`ActorDispatcher`] over the actor
//! runtime: an `Actor` action enqueues `{method, args}` to the type's queue
//! and awaits the response by polling the idempotency-free dispatch path.

use crate::error::RuntimeError;
use crate::runtime::ActorRuntime;
use async_trait::async_trait;
use loom_actor::ExecuteOutcome;
use loom_core::{ActorId, ActorType, Clock, Message, TraceId};
use loom_store::{KvService, StreamService};
use loom_workflow::ActorDispatcher;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// How long to wait when the target actor is busy before retrying.
const BUSY_BACKOFF: Duration = Duration::from_millis(50);

/// How many busy retries before giving up on a dispatch.
const BUSY_ATTEMPTS: u32 = 100;

pub struct RuntimeDispatcher<S, K, D, C> {
    runtime: Arc<ActorRuntime<S, K, D, C>>,
}

impl<S, K, D, C> RuntimeDispatcher<S, K, D, C> {
    pub fn new(runtime: Arc<ActorRuntime<S, K, D, C>>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl<S, K, D, C> ActorDispatcher for RuntimeDispatcher<S, K, D, C>
where
    S: StreamService + Clone,
    K: KvService + Clone,
    D: loom_store::DocumentService + Clone,
    C: Clock + 'static,
{
    async fn dispatch(
        &self,
        actor_type: &ActorType,
        actor_id: Option<&ActorId>,
        method: &str,
        args: Value,
    ) -> Result<Value, String> {
        let actor_id = match actor_id {
            Some(actor_id) => actor_id.clone(),
            // No explicit target: route to the least-loaded instance.
            None => self.runtime.least_loaded(actor_type),
        };
        let message = Message::new(actor_id, method, json!({"method": method, "args": args}));
        let trace_id = TraceId::new();

        for _ in 0..BUSY_ATTEMPTS {
            match self.runtime.dispatch(actor_type, &message, trace_id).await {
                Ok(ExecuteOutcome::Completed(value)) => return Ok(value),
                Ok(ExecuteOutcome::Suspended(interrupt)) => {
                    // The workflow action awaits a response; a suspension
                    // means the response arrives via the queue later.
                    return Err(format!("actor suspended: {interrupt}"));
                }
                Err(RuntimeError::ActorBusy(_)) => {
                    tokio::time::sleep(BUSY_BACKOFF).await;
                }
                Err(e) => return Err(e.to_string()),
            }
        }
        Err(format!("actor {actor_type} stayed busy"))
    }
}
