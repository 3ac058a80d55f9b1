// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! loom-runtime: Actor runtime, queue worker and metrics
//!
//! The runtime owns the registry of actor types and a bounded instance pool
//! with tiered LRU eviction. Dispatch serializes per actor id through a
//! leased lock, routes resume messages back into suspended instances, and
//! traces every boundary by reference. The queue worker drives the runtime
//! from a durable queue with idempotency, per-actor retry policies and
//! dead-letter routing.

pub mod dispatcher;
pub mod env;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod registry;
pub mod runtime;
pub mod worker;

pub use dispatcher::RuntimeDispatcher;
pub use env::{seed_secrets_from_env, RuntimeEnv, WELL_KNOWN_SECRETS};
pub use error::RuntimeError;
pub use metrics::{ComponentHealth, HealthStatus, MetricsCollector, MetricsSnapshot};
pub use pool::InstancePool;
pub use registry::ActorRegistry;
pub use runtime::{ActorRuntime, RuntimeStores};
pub use worker::QueueWorker;

/// Message types the worker interprets as resume deliveries rather than
/// fresh invocations.
pub mod message_types {
    /// Payload: `{"activityId": "...", "result": ...}`.
    pub const ACTIVITY_COMPLETED: &str = "activity:completed";
    /// Payload: `{"activityId": "...", "error": "..."}`.
    pub const ACTIVITY_FAILED: &str = "activity:failed";
    /// `event:<event_type>`; payload is the event data.
    pub const EVENT_PREFIX: &str = "event:";
}
