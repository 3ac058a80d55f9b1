// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store error types

use loom_core::ActorId;
use thiserror::Error;

/// Errors surfaced by the storage capabilities themselves.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Errors from the journal store.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// An appended entry no longer parses. Fatal to this actor's
    /// rehydration; the actor is quarantined until an operator intervenes.
    #[error("corrupt journal for actor {actor_id}: {detail}")]
    Corrupt { actor_id: ActorId, detail: String },
}

/// Errors from the message queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unknown job: {0}")]
    UnknownJob(String),
}

/// Errors from the secrets store.
#[derive(Debug, Error)]
pub enum SecretsError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Secret not found: {0}")]
    NotFound(String),
}
