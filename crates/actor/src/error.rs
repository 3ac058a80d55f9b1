// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Actor error taxonomy

use crate::interrupt::Interrupt;
use loom_core::{ActivityId, ActorId};
use loom_store::JournalError;
use thiserror::Error;

/// Errors surfaced from actor execution.
///
/// `Suspend` is not a failure: it unwinds the stack so the runtime can park
/// the actor; `is_suspend` distinguishes it before any retry/DLQ decision.
#[derive(Debug, Error)]
pub enum ActorError {
    #[error("suspended: {0}")]
    Suspend(Interrupt),

    /// The journal disagrees with the code path. Fatal to the invocation;
    /// the actor is quarantined until an operator intervenes.
    #[error("journal replay mismatch for actor {actor_id}: {detail}")]
    ReplayMismatch { actor_id: ActorId, detail: String },

    /// A recorded activity failure, rethrown on replay and on forward
    /// resumption with an error result.
    #[error("activity {activity_id} failed: {error}")]
    Activity { activity_id: ActivityId, error: String },

    /// User code failed.
    #[error("execution failed: {0}")]
    Execution(String),

    #[error(transparent)]
    Journal(#[from] JournalError),
}

impl ActorError {
    pub fn is_suspend(&self) -> bool {
        matches!(self, ActorError::Suspend(_))
    }

    /// Fatal errors quarantine the actor instead of retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ActorError::ReplayMismatch { .. } | ActorError::Journal(JournalError::Corrupt { .. }))
    }
}

impl From<Interrupt> for ActorError {
    fn from(interrupt: Interrupt) -> Self {
        ActorError::Suspend(interrupt)
    }
}
