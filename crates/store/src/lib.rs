// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! loom-store: Storage capabilities and the stores built on them
//!
//! The runtime assumes three abstract capabilities (an append-only stream
//! service, a KV service and a partitioned document service) and builds its
//! durable structures (journals, queues, idempotency cache, locks, traces,
//! secrets, progress streams) on top. Concrete engines live behind the
//! capability traits; `memory` provides the in-process reference
//! implementation used by tests and single-node deployments.

pub mod capability;
pub mod error;
pub mod idempotency;
pub mod journal;
pub mod lock;
pub mod memory;
pub mod queue;
pub mod secrets;
pub mod state;
pub mod streaming;
pub mod trace;

pub use capability::{
    DocQuery, DocumentService, KvService, StreamBound, StreamEntry, StreamEntryId, StreamInfo,
    StreamService,
};
pub use error::{JournalError, QueueError, SecretsError, StoreError};
pub use idempotency::IdempotencyStore;
pub use journal::{JournalRecord, JournalStore};
pub use lock::{Lease, LockManager};
pub use memory::{MemoryDocs, MemoryKv, MemoryStreams};
pub use queue::{
    AttemptRecord, AttemptStatus, DeliveredMessage, EnqueueOptions, JobRecord, JobStatus,
    MessageQueue, QueueStats,
};
pub use secrets::SecretsStore;
pub use state::StateStore;
pub use streaming::{StreamConsumer, StreamProducer};
pub use trace::{TraceFilter, TraceStore};
