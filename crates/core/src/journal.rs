// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal entry types for durable actor execution

use crate::id::{ActivityId, ActorType, ChildId, MessageId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One immutable key-level patch over actor state, paired with its inverse.
///
/// `value = None` means the key is removed going forward; `prev = None` means
/// the key was absent before the patch. Applying `value` then `prev` restores
/// the original state exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePatch {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<Value>,
}

impl StatePatch {
    /// The compensating patch: re-applies the prior value.
    pub fn invert(&self) -> StatePatch {
        StatePatch {
            key: self.key.clone(),
            value: self.prev.clone(),
            prev: self.value.clone(),
        }
    }
}

/// A checkpoint of full actor state at a journal cursor position.
///
/// When present, replay starts from the snapshot and applies only entries
/// past `cursor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: IndexMap<String, Value>,
    pub cursor: u64,
    pub timestamp_ms: u64,
}

/// Journaled effects of one actor's execution.
///
/// Serializes with `{"type": "entry_kind", ...fields}` format. Every
/// non-deterministic primitive an actor touches is recorded as one of these
/// so that replaying the journal against the same code reproduces
/// bit-identical state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JournalEntry {
    /// Inbound message payload and metadata, appended before user code runs.
    #[serde(rename = "invocation")]
    Invocation {
        message_id: MessageId,
        message_type: String,
        payload: Value,
        timestamp_ms: u64,
    },

    /// One `update_state` call: forward patches paired with inverses.
    #[serde(rename = "state_patches")]
    StatePatches {
        patches: Vec<StatePatch>,
        timestamp_ms: u64,
    },

    /// An activity call was scheduled; the actor suspends until its result
    /// arrives. `activity_id` comes from a monotonic counter reset on replay.
    #[serde(rename = "activity_scheduled")]
    ActivityScheduled {
        activity_id: ActivityId,
        name: String,
        input: Value,
    },

    #[serde(rename = "activity_completed")]
    ActivityCompleted {
        activity_id: ActivityId,
        result: Value,
    },

    #[serde(rename = "activity_failed")]
    ActivityFailed {
        activity_id: ActivityId,
        error: String,
    },

    /// A child actor was spawned with a deterministic id.
    #[serde(rename = "child_spawned")]
    ChildSpawned {
        child_id: ChildId,
        actor_type: ActorType,
        input: Value,
    },

    /// The actor yielded awaiting an external event.
    #[serde(rename = "suspended")]
    Suspended { reason: String },

    /// The awaited external event arrived.
    #[serde(rename = "event_received")]
    EventReceived { event_type: String, payload: Value },

    // -- audit entries: carried for lineage, skipped by the replay matcher --
    #[serde(rename = "decision_made")]
    DecisionMade { description: String, data: Value },

    #[serde(rename = "context_gathered")]
    ContextGathered { source: String, data: Value },

    #[serde(rename = "precedent_referenced")]
    PrecedentReferenced { reference: String, data: Value },

    #[serde(rename = "decision_outcome_tracked")]
    DecisionOutcomeTracked { outcome: String, data: Value },
}

impl JournalEntry {
    /// Wire tag of this entry, as recorded in trace references.
    pub fn entry_type(&self) -> &'static str {
        match self {
            JournalEntry::Invocation { .. } => "invocation",
            JournalEntry::StatePatches { .. } => "state_patches",
            JournalEntry::ActivityScheduled { .. } => "activity_scheduled",
            JournalEntry::ActivityCompleted { .. } => "activity_completed",
            JournalEntry::ActivityFailed { .. } => "activity_failed",
            JournalEntry::ChildSpawned { .. } => "child_spawned",
            JournalEntry::Suspended { .. } => "suspended",
            JournalEntry::EventReceived { .. } => "event_received",
            JournalEntry::DecisionMade { .. } => "decision_made",
            JournalEntry::ContextGathered { .. } => "context_gathered",
            JournalEntry::PrecedentReferenced { .. } => "precedent_referenced",
            JournalEntry::DecisionOutcomeTracked { .. } => "decision_outcome_tracked",
        }
    }

    /// Whether the replay matcher consumes this entry. Audit entries record
    /// lineage only and are not required for replay correctness.
    pub fn is_replay_relevant(&self) -> bool {
        !matches!(
            self,
            JournalEntry::DecisionMade { .. }
                | JournalEntry::ContextGathered { .. }
                | JournalEntry::PrecedentReferenced { .. }
                | JournalEntry::DecisionOutcomeTracked { .. }
        )
    }

    /// One-line summary for logs
    pub fn log_summary(&self) -> String {
        let t = self.entry_type();
        match self {
            JournalEntry::Invocation { message_id, message_type, .. } => {
                format!("{t} msg={message_id} kind={message_type}")
            }
            JournalEntry::StatePatches { patches, .. } => {
                format!("{t} patches={}", patches.len())
            }
            JournalEntry::ActivityScheduled { activity_id, name, .. } => {
                format!("{t} activity={activity_id} name={name}")
            }
            JournalEntry::ActivityCompleted { activity_id, .. }
            | JournalEntry::ActivityFailed { activity_id, .. } => {
                format!("{t} activity={activity_id}")
            }
            JournalEntry::ChildSpawned { child_id, actor_type, .. } => {
                format!("{t} child={child_id} type={actor_type}")
            }
            JournalEntry::Suspended { reason } => format!("{t} reason={reason}"),
            JournalEntry::EventReceived { event_type, .. } => {
                format!("{t} event={event_type}")
            }
            JournalEntry::DecisionMade { description, .. } => {
                format!("{t} description={description}")
            }
            JournalEntry::ContextGathered { source, .. } => format!("{t} source={source}"),
            JournalEntry::PrecedentReferenced { reference, .. } => {
                format!("{t} reference={reference}")
            }
            JournalEntry::DecisionOutcomeTracked { outcome, .. } => {
                format!("{t} outcome={outcome}")
            }
        }
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
