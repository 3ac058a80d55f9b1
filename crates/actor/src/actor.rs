// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The actor trait and execution outcomes

use crate::cell::ActorCell;
use crate::error::ActorError;
use crate::interrupt::Interrupt;
use serde_json::Value;

/// User-defined actor behavior.
///
/// `execute` is deterministic, synchronous compute. All non-determinism
/// (activity calls, child spawns, external events, state mutation) must go
/// through the cell's primitives; wall-clock reads, randomness and network
/// calls are disallowed outside activities. The same code replayed against
/// the same journal must take the same path.
///
/// `input` is the inbound message payload on a live invocation and `None`
/// on replay/resume runs, so actors branch on journaled state rather than
/// on the input alone.
pub trait Actor: Send + Sync {
    fn execute(&self, cell: &mut ActorCell, input: Option<&Value>) -> Result<Value, ActorError>;
}

/// How one run of `execute` ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteOutcome {
    Completed(Value),
    Suspended(Interrupt),
}

impl ExecuteOutcome {
    pub fn is_suspended(&self) -> bool {
        matches!(self, ExecuteOutcome::Suspended(_))
    }

    /// The completed value, if any.
    pub fn into_value(self) -> Option<Value> {
        match self {
            ExecuteOutcome::Completed(value) => Some(value),
            ExecuteOutcome::Suspended(_) => None,
        }
    }
}

/// Run `execute` over the cell's recorded history.
///
/// Enters replay mode, invokes `execute`, and interprets the result:
/// suspensions raised while replaying are benign (the journal already
/// records them), and a run that completes while matchable entries remain
/// unconsumed is a replay mismatch. `is_replaying` is cleared on every exit
/// path.
pub fn run_replay<A: Actor + ?Sized>(
    actor: &A,
    cell: &mut ActorCell,
    input: Option<&Value>,
) -> Result<ExecuteOutcome, ActorError> {
    cell.begin_replay();
    let result = actor.execute(cell, input);
    cell.end_replay();
    match result {
        Ok(value) => {
            if cell.has_unconsumed() {
                return Err(ActorError::ReplayMismatch {
                    actor_id: cell.context().actor_id.clone(),
                    detail: "execute completed with unconsumed journal entries".to_string(),
                });
            }
            Ok(ExecuteOutcome::Completed(value))
        }
        Err(ActorError::Suspend(interrupt)) => Ok(ExecuteOutcome::Suspended(interrupt)),
        Err(other) => Err(other),
    }
}
