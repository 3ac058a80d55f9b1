// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Actor runtime: activation, lock-guarded dispatch, eviction

use crate::error::RuntimeError;
use crate::message_types;
use crate::pool::InstancePool;
use crate::registry::ActorRegistry;
use loom_actor::{ActorError, ActorInstance, ExecuteOutcome};
use loom_core::{
    ActivityId, ActorContext, ActorId, ActorType, Clock, JournalRef, Message, SpanEvent, SpanRefs,
    SpanStatus, StateRef, StreamChunk, StreamId, TraceId,
};
use loom_store::{
    JournalStore, KvService, LockManager, StateStore, StreamProducer, StreamService, TraceStore,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default pool capacity before eviction kicks in.
const DEFAULT_POOL_CAPACITY: usize = 256;

/// The shared stores a runtime operates on.
#[derive(Clone)]
pub struct RuntimeStores<S, K, D, C> {
    pub journal: JournalStore<S, K>,
    pub state: StateStore<K>,
    pub locks: LockManager<K, C>,
    pub traces: TraceStore<D>,
    pub streams: S,
}

/// Hosts actor instances and dispatches messages to them.
///
/// One invocation at a time per actor id, guarded by a leased lock that is
/// extended while the invocation runs. Across ids, dispatch is parallel up
/// to each type's configured concurrency.
pub struct ActorRuntime<S, K, D, C> {
    registry: Arc<ActorRegistry>,
    pool: Mutex<InstancePool<S, K, C>>,
    stores: RuntimeStores<S, K, D, C>,
    semaphores: Mutex<HashMap<ActorType, Arc<Semaphore>>>,
    in_flight: Mutex<HashMap<ActorType, HashMap<ActorId, usize>>>,
    clock: C,
}

impl<S, K, D, C> ActorRuntime<S, K, D, C>
where
    S: StreamService + Clone,
    K: KvService + Clone,
    D: loom_store::DocumentService + Clone,
    C: Clock + 'static,
{
    pub fn new(registry: Arc<ActorRegistry>, stores: RuntimeStores<S, K, D, C>, clock: C) -> Self {
        Self {
            registry,
            pool: Mutex::new(InstancePool::new(DEFAULT_POOL_CAPACITY)),
            stores,
            semaphores: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool = Mutex::new(InstancePool::new(capacity));
        self
    }

    pub fn registry(&self) -> &ActorRegistry {
        &self.registry
    }

    pub fn stores(&self) -> &RuntimeStores<S, K, D, C> {
        &self.stores
    }

    /// Per-type concurrency gate.
    pub fn semaphore(&self, actor_type: &ActorType, concurrency: usize) -> Arc<Semaphore> {
        self.semaphores
            .lock()
            .entry(actor_type.clone())
            .or_insert_with(|| Arc::new(Semaphore::new(concurrency.max(1))))
            .clone()
    }

    /// Pick the least-loaded known instance of a type, or mint the first id.
    pub fn least_loaded(&self, actor_type: &ActorType) -> ActorId {
        let in_flight = self.in_flight.lock();
        in_flight
            .get(actor_type)
            .and_then(|per_actor| {
                per_actor
                    .iter()
                    .min_by_key(|(id, count)| (**count, (*id).clone()))
                    .map(|(id, _)| id.clone())
            })
            .unwrap_or_else(|| ActorId::new(format!("{}-1", actor_type.to_lowercase())))
    }

    /// Dispatch one message to its actor, serialized by the per-actor lock.
    ///
    /// Resume message types route back into the suspended instance; anything
    /// else is a fresh invocation. The lock is released on success,
    /// suspension and failure alike.
    pub async fn dispatch(
        &self,
        actor_type: &ActorType,
        message: &Message,
        trace_id: TraceId,
    ) -> Result<ExecuteOutcome, RuntimeError> {
        let config = self
            .registry
            .config_of(actor_type)
            .ok_or_else(|| RuntimeError::UnknownActorType(actor_type.clone()))?;
        let actor_id = message.actor_id.clone();

        let lock_key = format!("actor:{actor_id}");
        // The lease outlives the timeout margin; extension keeps it alive
        // for slow invocations.
        let ttl_ms = config.timeout_ms + 5_000;
        let Some(mut lease) = self.stores.locks.acquire(&lock_key, ttl_ms).await? else {
            return Err(RuntimeError::ActorBusy(actor_id));
        };

        self.track(actor_type, &actor_id, 1);
        let result = {
            let work = self.dispatch_locked(actor_type, &config, message);
            tokio::pin!(work);
            loop {
                let extend_after = Duration::from_millis(ttl_ms / 2);
                tokio::select! {
                    result = &mut work => break result,
                    _ = tokio::time::sleep(extend_after) => {
                        if !self.stores.locks.extend(&mut lease, ttl_ms).await.unwrap_or(false) {
                            tracing::warn!(actor_id = %message.actor_id, "lost actor lease mid-invocation");
                        }
                    }
                }
            }
        };
        self.track(actor_type, &actor_id, -1);

        if let Err(e) = self.stores.locks.release(lease).await {
            tracing::warn!(actor_id = %message.actor_id, error = %e, "lock release failed");
        }

        self.emit_outcome_span(&message.actor_id, trace_id, &result).await;
        result
    }

    /// Dispatch wrapped in the actor's default progress stream: `start`,
    /// then `complete` or `error`.
    pub async fn dispatch_streamed(
        &self,
        actor_type: &ActorType,
        message: &Message,
        trace_id: TraceId,
        stream_id: StreamId,
    ) -> Result<ExecuteOutcome, RuntimeError> {
        let producer =
            StreamProducer::new(self.stores.streams.clone(), self.clock.clone(), stream_id);
        if let Err(e) = producer.start().await {
            tracing::warn!(error = %e, "stream start failed");
        }
        let result = self.dispatch(actor_type, message, trace_id).await;
        let publish = match &result {
            Ok(ExecuteOutcome::Completed(value)) => {
                let _ = producer.publish(StreamChunk::Data { payload: value.clone() }).await;
                producer.complete().await
            }
            Ok(ExecuteOutcome::Suspended(interrupt)) => {
                let _ = producer
                    .publish(StreamChunk::Progress {
                        current: 0,
                        total: None,
                        message: Some(interrupt.to_string()),
                    })
                    .await;
                producer.complete().await
            }
            Err(e) => producer.error(e.to_string()).await,
        };
        if let Err(e) = publish {
            tracing::warn!(error = %e, "stream publish failed");
        }
        result
    }

    async fn dispatch_locked(
        &self,
        actor_type: &ActorType,
        config: &loom_core::ActorConfig,
        message: &Message,
    ) -> Result<ExecuteOutcome, RuntimeError> {
        let actor_id = &message.actor_id;
        let checked_out = self.pool.lock().check_out(actor_id);
        let mut instance = match checked_out {
            Some(instance) => instance,
            None => self.activate(actor_type, config, message).await?,
        };

        let outcome = self.route(&mut instance, message).await;

        if let Ok(ExecuteOutcome::Completed(_)) = &outcome {
            let state = instance.cell().state().clone();
            if let Err(e) = self.stores.state.save_state(actor_id, &state).await {
                tracing::warn!(actor_id = %actor_id, error = %e, "state blob save failed");
            }
        }

        // Failed instances are not pooled; the journal is the recovery path.
        match &outcome {
            Ok(_) => {
                let evicted = self.pool.lock().check_in(
                    actor_id.clone(),
                    instance,
                    config.eviction_priority,
                );
                for id in evicted {
                    tracing::debug!(actor_id = %id, "evicted under pool pressure");
                }
            }
            Err(_) => {
                self.pool.lock().remove(actor_id);
            }
        }
        outcome.map_err(RuntimeError::from)
    }

    async fn activate(
        &self,
        actor_type: &ActorType,
        config: &loom_core::ActorConfig,
        message: &Message,
    ) -> Result<ActorInstance<S, K, C>, RuntimeError> {
        let context = ActorContext::new(message.actor_id.clone(), actor_type.clone())
            .with_correlation(message.correlation_id.clone());
        let actor = self
            .registry
            .build(actor_type, &context)
            .ok_or_else(|| RuntimeError::UnknownActorType(actor_type.clone()))?;
        tracing::debug!(actor_id = %message.actor_id, actor_type = %actor_type, "activating");
        Ok(ActorInstance::activate(
            actor,
            context,
            config.clone(),
            self.stores.journal.clone(),
            self.clock.clone(),
        )
        .await?)
    }

    async fn route(
        &self,
        instance: &mut ActorInstance<S, K, C>,
        message: &Message,
    ) -> Result<ExecuteOutcome, ActorError> {
        match message.message_type.as_str() {
            message_types::ACTIVITY_COMPLETED => {
                let (activity_id, payload) = activity_payload(&message.payload, "result")?;
                instance.resume_with_activity(activity_id, payload).await
            }
            message_types::ACTIVITY_FAILED => {
                let (activity_id, payload) = activity_payload(&message.payload, "error")?;
                let error = payload.as_str().unwrap_or("activity failed").to_string();
                instance.resume_with_activity_error(activity_id, &error).await
            }
            event_type if event_type.starts_with(message_types::EVENT_PREFIX) => {
                let event_type = &event_type[message_types::EVENT_PREFIX.len()..];
                instance.resume(event_type, message.payload.clone()).await
            }
            _ => instance.handle_message(message).await,
        }
    }

    fn track(&self, actor_type: &ActorType, actor_id: &ActorId, delta: isize) {
        let mut in_flight = self.in_flight.lock();
        let per_actor = in_flight.entry(actor_type.clone()).or_default();
        let count = per_actor.entry(actor_id.clone()).or_insert(0);
        *count = count.saturating_add_signed(delta);
    }

    async fn emit_outcome_span(
        &self,
        actor_id: &ActorId,
        trace_id: TraceId,
        result: &Result<ExecuteOutcome, RuntimeError>,
    ) {
        let (event_type, status) = match result {
            Ok(ExecuteOutcome::Completed(_)) => ("actor_completed", SpanStatus::Ok),
            Ok(ExecuteOutcome::Suspended(_)) => ("actor_suspended", SpanStatus::Ok),
            Err(_) => ("actor_failed", SpanStatus::Error),
        };
        // Spans carry pointers into the journal and state, never payloads.
        let mut refs = SpanRefs::default();
        if let Ok(Some(record)) = self.stores.journal.last_entry(actor_id).await {
            refs.actor_state = Some(StateRef { actor_id: actor_id.clone(), cursor: record.index + 1 });
            refs.journal_entry = Some(JournalRef {
                actor_id: actor_id.clone(),
                entry_index: record.index,
                entry_type: record.entry.entry_type().to_string(),
            });
        }
        let span = SpanEvent::new(trace_id, event_type, self.clock.epoch_ms())
            .with_status(status)
            .with_refs(refs);
        self.stores.traces.emit(&span).await;
    }
}

fn activity_payload(payload: &Value, field: &str) -> Result<(ActivityId, Value), ActorError> {
    let activity_id = payload
        .get("activityId")
        .and_then(Value::as_str)
        .ok_or_else(|| ActorError::Execution("resume message missing activityId".to_string()))?;
    Ok((
        ActivityId::new(activity_id),
        payload.get(field).cloned().unwrap_or(Value::Null),
    ))
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
