// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! loom-core: Shared data model for the Loom durable actor runtime

pub mod clock;
pub mod config;
pub mod context;
pub mod id;
pub mod idempotency;
pub mod journal;
pub mod message;
pub mod retry;
pub mod secret;
pub mod stream;
pub mod trace;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    ActorConfig, Backoff, EvictionPriority, MessageOrdering, RetryPolicy, DEFAULT_TIMEOUT_MS,
};
pub use context::ActorContext;
pub use id::{short, ActivityId, ActorId, ActorType, ChildId, QueueName, WorkflowId};
pub use id::{InstanceId, LockToken, MessageId, SpanId, StreamId, TraceId};
pub use idempotency::IdempotencyRecord;
pub use journal::{JournalEntry, Snapshot, StatePatch};
pub use message::{Message, MessageMetadata};
pub use retry::calculate_retry_delay;
pub use secret::{SecretAttributes, SecretProperties, SecretVersion};
pub use stream::StreamChunk;
pub use trace::{
    IdempotencyRef, JournalRef, MessageRef, SpanEvent, SpanRefs, SpanStatus, StateRef,
};
