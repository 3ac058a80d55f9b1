// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime error types

use loom_core::{ActorId, ActorType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unknown actor type: {0}")]
    UnknownActorType(ActorType),

    /// The per-actor lock is held elsewhere. Transient: the caller retries.
    #[error("actor {0} is busy")]
    ActorBusy(ActorId),

    #[error("invocation timed out after {timeout_ms}ms for actor {actor_id}")]
    Timeout { actor_id: ActorId, timeout_ms: u64 },

    #[error(transparent)]
    Actor(#[from] loom_actor::ActorError),

    #[error(transparent)]
    Queue(#[from] loom_store::QueueError),

    #[error(transparent)]
    Store(#[from] loom_store::StoreError),
}

impl RuntimeError {
    /// A busy actor is redelivered after a short delay rather than treated
    /// as a failure.
    pub fn is_busy(&self) -> bool {
        matches!(self, RuntimeError::ActorBusy(_))
    }

    /// Fatal errors quarantine the message straight to the dead-letter
    /// queue, bypassing retries.
    pub fn is_fatal(&self) -> bool {
        match self {
            RuntimeError::Actor(e) => e.is_fatal(),
            _ => false,
        }
    }
}
