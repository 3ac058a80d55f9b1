// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue worker: consume → dedupe → dispatch → ack/retry/dead-letter

use crate::metrics::MetricsCollector;
use crate::runtime::ActorRuntime;
use loom_actor::ExecuteOutcome;
use loom_core::{
    calculate_retry_delay, ActorType, Clock, IdempotencyRecord, Message, MessageRef, QueueName,
    SpanEvent, SpanRefs, SpanStatus, TraceId,
};
use loom_store::{DeliveredMessage, IdempotencyStore, KvService, MessageQueue, StreamService};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bounded blocking poll per loop turn.
const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Delay before redelivering a message whose actor lock was busy.
const BUSY_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Consumes one queue and dispatches to one actor type.
///
/// With `fifo` ordering every message is processed inline, serializing
/// dispatch in arrival order. With `standard` ordering each delivery is
/// processed as its own task, so distinct actor ids run in parallel up to
/// the type's concurrency semaphore; siblings may reorder.
pub struct QueueWorker<S, K, D, C> {
    runtime: Arc<ActorRuntime<S, K, D, C>>,
    queue: MessageQueue<K, C>,
    idempotency: IdempotencyStore<K, C>,
    metrics: Arc<MetricsCollector>,
    queue_name: QueueName,
    actor_type: ActorType,
    clock: C,
}

impl<S, K, D, C> QueueWorker<S, K, D, C>
where
    S: StreamService + Clone,
    K: KvService + Clone,
    D: loom_store::DocumentService + Clone,
    C: Clock + 'static,
{
    pub fn new(
        runtime: Arc<ActorRuntime<S, K, D, C>>,
        queue: MessageQueue<K, C>,
        idempotency: IdempotencyStore<K, C>,
        metrics: Arc<MetricsCollector>,
        queue_name: impl Into<QueueName>,
        actor_type: impl Into<ActorType>,
        clock: C,
    ) -> Self {
        Self {
            runtime,
            queue,
            idempotency,
            metrics,
            queue_name: queue_name.into(),
            actor_type: actor_type.into(),
            clock,
        }
    }

    /// Run until cancelled. Poll failures back off briefly and continue.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::info!(queue = %self.queue_name, actor_type = %self.actor_type, "worker started");
        let fifo = self
            .runtime
            .registry()
            .config_of(&self.actor_type)
            .map(|c| c.message_ordering == loom_core::MessageOrdering::Fifo)
            .unwrap_or(true);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                polled = self.queue.dequeue(&self.queue_name, POLL_TIMEOUT) => {
                    match polled {
                        Ok(Some(delivery)) if fifo => self.process(delivery).await,
                        Ok(Some(delivery)) => {
                            // Standard ordering: parallel across actor ids,
                            // bounded by the type semaphore inside process().
                            let worker = self.clone();
                            tokio::spawn(async move { worker.process(delivery).await });
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::error!(queue = %self.queue_name, error = %e, "dequeue failed");
                            tokio::time::sleep(POLL_TIMEOUT).await;
                        }
                    }
                }
            }
        }
        tracing::info!(queue = %self.queue_name, "worker stopped");
    }

    /// Process one delivery end to end. Every exit path settles the message:
    /// ack, delayed redelivery, or dead-letter.
    pub async fn process(&self, delivery: DeliveredMessage) {
        let message = &delivery.message;
        let trace_id = trace_id_of(message);
        let Some(config) = self.runtime.registry().config_of(&self.actor_type) else {
            self.settle_error(
                &delivery,
                trace_id,
                &format!("unknown actor type: {}", self.actor_type),
                true,
            )
            .await;
            return;
        };

        self.emit(trace_id, "message_received", SpanStatus::Ok, message).await;
        self.metrics.incr("worker.messages_received");

        // Exactly-once: a cached record short-circuits the dispatch.
        if let Some(key) = &message.metadata.idempotency_key {
            match self.idempotency.get(key).await {
                Ok(Some(record)) => {
                    tracing::info!(
                        queue = %self.queue_name,
                        key = %key,
                        executed_at_ms = record.executed_at_ms,
                        "duplicate delivery, returning cached result"
                    );
                    self.emit(trace_id, "message_deduplicated", SpanStatus::Ok, message).await;
                    self.metrics.incr("worker.messages_deduplicated");
                    self.ack(&delivery).await;
                    return;
                }
                Ok(None) => {}
                Err(e) => {
                    // Transient cache failure: proceed; the record write on
                    // success restores the guarantee for later deliveries.
                    tracing::warn!(key = %key, error = %e, "idempotency lookup failed");
                }
            }
        }

        // Per-type concurrency gate; the semaphore is never closed.
        let permit = self
            .runtime
            .semaphore(&self.actor_type, config.concurrency)
            .acquire_owned()
            .await
            .ok();

        let timeout = Duration::from_millis(config.timeout_ms);
        let dispatched =
            tokio::time::timeout(timeout, self.runtime.dispatch(&self.actor_type, message, trace_id))
                .await;
        drop(permit);

        match dispatched {
            Ok(Ok(ExecuteOutcome::Completed(value))) => {
                if let Some(key) = &message.metadata.idempotency_key {
                    let now_ms = self.clock.epoch_ms();
                    let record = IdempotencyRecord {
                        key: key.clone(),
                        actor_id: message.actor_id.clone(),
                        result: value,
                        executed_at_ms: now_ms,
                        expires_at_ms: now_ms + config.idempotency_ttl_secs * 1_000,
                        message_id: Some(message.message_id),
                        metadata: serde_json::Value::Null,
                    };
                    if let Err(e) = self.idempotency.put(&record).await {
                        tracing::warn!(key = %key, error = %e, "idempotency record write failed");
                    }
                }
                self.metrics.incr("worker.messages_completed");
                self.ack(&delivery).await;
            }
            Ok(Ok(ExecuteOutcome::Suspended(interrupt))) => {
                // The suspension is durable in the journal; the message is
                // done.
                tracing::debug!(actor_id = %message.actor_id, %interrupt, "actor suspended");
                self.metrics.incr("worker.messages_suspended");
                self.ack(&delivery).await;
            }
            Ok(Err(e)) if e.is_busy() => {
                // Not a failure: the actor is mid-invocation elsewhere.
                self.metrics.incr("worker.messages_requeued_busy");
                if let Err(e) = self
                    .queue
                    .retry(&self.queue_name, &delivery.job_id, BUSY_RETRY_DELAY, "actor busy")
                    .await
                {
                    tracing::error!(job = %delivery.job_id, error = %e, "busy requeue failed");
                }
            }
            Ok(Err(e)) => {
                self.settle_error(&delivery, trace_id, &e.to_string(), e.is_fatal()).await;
            }
            Err(_elapsed) => {
                self.emit(trace_id, "message_timeout", SpanStatus::Error, message).await;
                self.settle_error(
                    &delivery,
                    trace_id,
                    &format!("invocation timed out after {}ms", config.timeout_ms),
                    false,
                )
                .await;
            }
        }
    }

    /// Apply the retry policy to a failed delivery: delayed redelivery while
    /// attempts remain, then dead-letter (or drop when disabled).
    async fn settle_error(
        &self,
        delivery: &DeliveredMessage,
        trace_id: TraceId,
        error: &str,
        fatal: bool,
    ) {
        let message = &delivery.message;
        let config = self.runtime.registry().config_of(&self.actor_type).unwrap_or_default();
        let policy = &config.retry_policy;

        tracing::warn!(
            queue = %self.queue_name,
            actor_id = %message.actor_id,
            attempt = delivery.attempt,
            max_attempts = policy.max_attempts,
            error = %error,
            "invocation failed"
        );
        self.metrics.incr("worker.messages_failed");

        if !fatal && delivery.attempt < policy.max_attempts {
            let delay = calculate_retry_delay(policy, delivery.attempt);
            self.emit(trace_id, "message_retry", SpanStatus::Error, message).await;
            self.metrics.incr("worker.messages_retried");
            if let Err(e) = self.queue.retry(&self.queue_name, &delivery.job_id, delay, error).await
            {
                tracing::error!(job = %delivery.job_id, error = %e, "retry enqueue failed");
            }
            return;
        }

        if config.dead_letter_queue {
            self.emit(trace_id, "message_dead_lettered", SpanStatus::Error, message).await;
            self.metrics.incr("worker.messages_dead_lettered");
            if let Err(e) = self.queue.dead_letter(&self.queue_name, &delivery.job_id, error).await {
                tracing::error!(job = %delivery.job_id, error = %e, "dead-letter failed");
            }
        } else {
            // Retries exhausted and no DLQ: drop the message.
            self.metrics.incr("worker.messages_dropped");
            self.ack(delivery).await;
        }
    }

    async fn ack(&self, delivery: &DeliveredMessage) {
        if let Err(e) = self.queue.ack(&self.queue_name, &delivery.job_id).await {
            tracing::error!(job = %delivery.job_id, error = %e, "ack failed");
        }
    }

    async fn emit(
        &self,
        trace_id: TraceId,
        event_type: &str,
        status: SpanStatus,
        message: &Message,
    ) {
        let refs = SpanRefs {
            message: Some(MessageRef {
                message_id: message.message_id,
                queue_name: self.queue_name.clone(),
                correlation_id: message.correlation_id.clone(),
            }),
            ..SpanRefs::default()
        };
        let span = SpanEvent::new(trace_id, event_type, self.clock.epoch_ms())
            .with_status(status)
            .with_refs(refs);
        self.runtime.stores().traces.emit(&span).await;
    }
}

/// Reuse the caller's trace when the correlation id carries one; otherwise
/// the delivery starts a fresh trace.
fn trace_id_of(message: &Message) -> TraceId {
    if message.correlation_id.starts_with(TraceId::PREFIX) {
        TraceId::from_string(&message.correlation_id)
    } else {
        TraceId::new()
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
