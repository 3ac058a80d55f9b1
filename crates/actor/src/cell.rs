// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Actor cell: state, journal window and the typed primitives
//!
//! The cell is purely in-memory. It holds the retained journal window (the
//! entries past the latest snapshot), the materialized state, and the replay
//! position. Primitives consume recorded entries while replaying and append
//! new ones once execution runs past the recorded history. Durability is the
//! instance's concern: the cell tracks which entries are not yet persisted.

use crate::error::ActorError;
use crate::interrupt::Interrupt;
use crate::state::{apply_patches, diff_states};
use indexmap::IndexMap;
use loom_core::{
    ActivityId, ActorConfig, ActorContext, ChildId, JournalEntry, Message, Snapshot, StatePatch,
};
use loom_store::JournalRecord;
use serde_json::Value;

/// What a primitive found at the replay position.
enum Consumed {
    /// A matchable entry was consumed.
    Entry(JournalEntry),
    /// Recorded history is exhausted; the primitive proceeds in forward mode.
    EndOfJournal,
}

pub struct ActorCell {
    context: ActorContext,
    config: ActorConfig,
    /// State at the snapshot cursor; replay resets to this before folding.
    base_state: IndexMap<String, Value>,
    state: IndexMap<String, Value>,
    /// Retained journal window, global indices `base_cursor..`.
    entries: Vec<JournalRecord>,
    base_cursor: u64,
    /// Entries `[..persisted_len]` are durably stored.
    persisted_len: usize,
    replay_pos: usize,
    is_replaying: bool,
    activity_counter: u64,
    child_counter: u64,
    /// Wall-clock stamp for new entries, injected per invocation.
    now_ms: u64,
    last_compaction_ms: u64,
}

impl ActorCell {
    /// Fresh cell with default (empty) state and no journal.
    pub fn new(context: ActorContext, config: ActorConfig) -> Self {
        Self::hydrate(context, config, None, Vec::new())
    }

    /// Cell hydrated from a snapshot (if any) plus the retained journal.
    ///
    /// State is materialized immediately: snapshot state (or default) with
    /// every recorded `state_patches` entry folded in.
    pub fn hydrate(
        context: ActorContext,
        config: ActorConfig,
        snapshot: Option<Snapshot>,
        entries: Vec<JournalRecord>,
    ) -> Self {
        let (base_state, base_cursor) = match snapshot {
            Some(snapshot) => (snapshot.state, snapshot.cursor),
            None => (IndexMap::new(), 0),
        };
        let mut state = base_state.clone();
        for record in &entries {
            if let JournalEntry::StatePatches { patches, .. } = &record.entry {
                apply_patches(&mut state, patches);
            }
        }
        let persisted_len = entries.len();
        Self {
            context,
            config,
            base_state,
            state,
            entries,
            base_cursor,
            persisted_len,
            replay_pos: 0,
            is_replaying: false,
            activity_counter: 0,
            child_counter: 0,
            now_ms: 0,
            last_compaction_ms: 0,
        }
    }

    pub fn context(&self) -> &ActorContext {
        &self.context
    }

    pub fn config(&self) -> &ActorConfig {
        &self.config
    }

    /// Current materialized state.
    pub fn state(&self) -> &IndexMap<String, Value> {
        &self.state
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    /// Global cursor: index one past the last retained entry.
    pub fn cursor(&self) -> u64 {
        self.base_cursor + self.entries.len() as u64
    }

    pub fn entries(&self) -> &[JournalRecord] {
        &self.entries
    }

    pub fn is_replaying(&self) -> bool {
        self.is_replaying
    }

    /// Stamp used for new journal entries. Set by the instance before each
    /// run; never read by user code.
    pub fn set_now_ms(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
    }

    // ── journal append ──────────────────────────────────────────────────

    fn append(&mut self, entry: JournalEntry) {
        let index = self.cursor();
        self.entries.push(JournalRecord { index, entry });
    }

    /// Entries not yet durably stored, with their indices.
    pub fn unpersisted(&self) -> &[JournalRecord] {
        &self.entries[self.persisted_len..]
    }

    /// Advance the persistence watermark after a successful flush.
    pub fn mark_persisted(&mut self, count: usize) {
        self.persisted_len = (self.persisted_len + count).min(self.entries.len());
    }

    // ── replay machinery ────────────────────────────────────────────────

    /// Reset to the snapshot base and enter replay mode.
    ///
    /// State is refolded from the snapshot plus every recorded patch. The
    /// replay matcher, however, is scoped to the current run: entries after
    /// the latest `invocation` receipt. Earlier entries belong to completed
    /// runs whose effects the fold already carries.
    pub(crate) fn begin_replay(&mut self) {
        self.state = self.base_state.clone();
        for record in &self.entries {
            if let JournalEntry::StatePatches { patches, .. } = &record.entry {
                apply_patches(&mut self.state, patches);
            }
        }
        self.replay_pos = self
            .entries
            .iter()
            .rposition(|r| matches!(r.entry, JournalEntry::Invocation { .. }))
            .map(|pos| pos + 1)
            .unwrap_or(0);
        self.activity_counter = 0;
        self.child_counter = 0;
        self.is_replaying = self.replay_pos < self.entries.len();
    }

    pub(crate) fn end_replay(&mut self) {
        self.is_replaying = false;
    }

    /// Whether any matchable entries remain unconsumed.
    pub(crate) fn has_unconsumed(&self) -> bool {
        self.entries[self.replay_pos..]
            .iter()
            .any(|r| is_matchable(&r.entry))
    }

    /// Consume the next matchable entry, skipping receipts and audit
    /// entries. Flips to forward mode at the end of recorded history.
    fn consume(&mut self) -> Consumed {
        while self.replay_pos < self.entries.len() {
            let record = &self.entries[self.replay_pos];
            self.replay_pos += 1;
            if is_matchable(&record.entry) {
                return Consumed::Entry(record.entry.clone());
            }
        }
        self.end_replay();
        Consumed::EndOfJournal
    }

    /// Peek variant of [`consume`] that does not flip modes: used for
    /// completion lookahead where end-of-journal means a live suspension.
    fn consume_for_result(&mut self) -> Option<JournalEntry> {
        while self.replay_pos < self.entries.len() {
            let record = &self.entries[self.replay_pos];
            self.replay_pos += 1;
            if is_matchable(&record.entry) {
                return Some(record.entry.clone());
            }
        }
        None
    }

    fn mismatch(&self, detail: impl Into<String>) -> ActorError {
        ActorError::ReplayMismatch {
            actor_id: self.context.actor_id.clone(),
            detail: detail.into(),
        }
    }

    // ── primitives ──────────────────────────────────────────────────────

    /// Mutate state through a draft copy, journaling forward and inverse
    /// patches. One entry is appended per call, even when nothing changed,
    /// so replay consumes entries one-for-one.
    pub fn update_state(
        &mut self,
        f: impl FnOnce(&mut IndexMap<String, Value>),
    ) -> Result<(), ActorError> {
        if self.is_replaying {
            match self.consume() {
                Consumed::Entry(JournalEntry::StatePatches { .. }) => {
                    // State was folded in begin_replay; nothing to re-apply.
                    return Ok(());
                }
                Consumed::Entry(other) => {
                    return Err(self.mismatch(format!(
                        "expected state_patches, journal has {}",
                        other.entry_type()
                    )))
                }
                Consumed::EndOfJournal => {}
            }
        }
        let mut draft = self.state.clone();
        f(&mut draft);
        let patches = diff_states(&self.state, &draft);
        self.state = draft;
        self.append(JournalEntry::StatePatches { patches, timestamp_ms: self.now_ms });
        Ok(())
    }

    /// Undo the most recent `update_state` by applying its inverse patches.
    /// The compensation is itself journaled as a `state_patches` entry.
    pub fn compensate_last_state_change(&mut self) -> Result<(), ActorError> {
        if self.is_replaying {
            return match self.consume() {
                Consumed::Entry(JournalEntry::StatePatches { .. }) => Ok(()),
                Consumed::Entry(other) => Err(self.mismatch(format!(
                    "expected state_patches, journal has {}",
                    other.entry_type()
                ))),
                Consumed::EndOfJournal => self.compensate_forward(),
            };
        }
        self.compensate_forward()
    }

    fn compensate_forward(&mut self) -> Result<(), ActorError> {
        let last = self.entries.iter().rev().find_map(|record| match &record.entry {
            JournalEntry::StatePatches { patches, .. } => Some(patches.clone()),
            _ => None,
        });
        let Some(patches) = last else {
            tracing::warn!(actor_id = %self.context.actor_id, "no state change to compensate");
            self.append(JournalEntry::StatePatches { patches: Vec::new(), timestamp_ms: self.now_ms });
            return Ok(());
        };
        let inverse: Vec<StatePatch> = patches.iter().rev().map(StatePatch::invert).collect();
        let mut draft = self.state.clone();
        apply_patches(&mut draft, &inverse);
        self.state = draft;
        self.append(JournalEntry::StatePatches { patches: inverse, timestamp_ms: self.now_ms });
        Ok(())
    }

    /// Call an external activity.
    ///
    /// Forward: journals `activity_scheduled` and suspends. Replay: returns
    /// the recorded result, rethrows the recorded failure, or re-raises the
    /// live suspension when no result is recorded yet.
    pub fn call_activity(&mut self, name: &str, input: Value) -> Result<Value, ActorError> {
        self.activity_counter += 1;
        let activity_id = ActivityId::from_counter(self.activity_counter);

        if self.is_replaying {
            match self.consume() {
                Consumed::Entry(JournalEntry::ActivityScheduled {
                    activity_id: recorded_id,
                    name: recorded_name,
                    ..
                }) => {
                    if recorded_id != activity_id || recorded_name != name {
                        return Err(self.mismatch(format!(
                            "expected activity {activity_id} ({name}), journal has {recorded_id} ({recorded_name})"
                        )));
                    }
                    return match self.consume_for_result() {
                        Some(JournalEntry::ActivityCompleted { activity_id: done_id, result })
                            if done_id == activity_id =>
                        {
                            Ok(result)
                        }
                        Some(JournalEntry::ActivityFailed { activity_id: done_id, error })
                            if done_id == activity_id =>
                        {
                            Err(ActorError::Activity { activity_id, error })
                        }
                        // No result recorded: we replayed up to the live
                        // suspension point.
                        None => Err(Interrupt::Activity {
                            activity_id,
                            name: name.to_string(),
                            input,
                        }
                        .into()),
                        Some(other) => Err(self.mismatch(format!(
                            "expected result for {activity_id}, journal has {}",
                            other.entry_type()
                        ))),
                    };
                }
                Consumed::Entry(other) => {
                    return Err(self.mismatch(format!(
                        "expected activity_scheduled, journal has {}",
                        other.entry_type()
                    )))
                }
                Consumed::EndOfJournal => {}
            }
        }

        self.append(JournalEntry::ActivityScheduled {
            activity_id: activity_id.clone(),
            name: name.to_string(),
            input: input.clone(),
        });
        Err(Interrupt::Activity { activity_id, name: name.to_string(), input }.into())
    }

    /// Spawn a child actor with a deterministic id. Does not suspend.
    pub fn spawn_child(
        &mut self,
        actor_type: impl Into<loom_core::ActorType>,
        input: Value,
    ) -> Result<ChildId, ActorError> {
        self.child_counter += 1;
        let child_id = ChildId::derive(&self.context.actor_id, self.child_counter);
        let actor_type = actor_type.into();

        if self.is_replaying {
            match self.consume() {
                Consumed::Entry(JournalEntry::ChildSpawned { child_id: recorded, .. }) => {
                    if recorded != child_id {
                        return Err(self.mismatch(format!(
                            "expected child {child_id}, journal has {recorded}"
                        )));
                    }
                    return Ok(child_id);
                }
                Consumed::Entry(other) => {
                    return Err(self.mismatch(format!(
                        "expected child_spawned, journal has {}",
                        other.entry_type()
                    )))
                }
                Consumed::EndOfJournal => {}
            }
        }

        self.append(JournalEntry::ChildSpawned { child_id: child_id.clone(), actor_type, input });
        Ok(child_id)
    }

    /// Await an external event.
    ///
    /// Forward: journals the suspension and yields. Replay: returns the
    /// recorded event payload, or re-raises the live suspension.
    pub fn wait_for_event(&mut self, event_type: &str) -> Result<Value, ActorError> {
        let reason = format!("awaiting_event:{event_type}");

        if self.is_replaying {
            match self.consume() {
                Consumed::Entry(JournalEntry::Suspended { reason: recorded }) => {
                    if recorded != reason {
                        return Err(self.mismatch(format!(
                            "expected suspension {reason}, journal has {recorded}"
                        )));
                    }
                    return match self.consume_for_result() {
                        Some(JournalEntry::EventReceived { event_type: received, payload })
                            if received == event_type =>
                        {
                            Ok(payload)
                        }
                        None => Err(Interrupt::Event { event_type: event_type.to_string() }.into()),
                        Some(other) => Err(self.mismatch(format!(
                            "expected event_received:{event_type}, journal has {}",
                            other.entry_type()
                        ))),
                    };
                }
                Consumed::Entry(other) => {
                    return Err(self.mismatch(format!(
                        "expected suspended, journal has {}",
                        other.entry_type()
                    )))
                }
                Consumed::EndOfJournal => {}
            }
        }

        self.append(JournalEntry::Suspended { reason });
        Err(Interrupt::Event { event_type: event_type.to_string() }.into())
    }

    // ── receipts and audit entries ──────────────────────────────────────

    /// Journal the inbound message before user code runs, so the payload is
    /// part of the deterministic lineage. Called by the instance, not by
    /// `execute`.
    pub fn record_invocation(&mut self, message: &Message) {
        self.append(JournalEntry::Invocation {
            message_id: message.message_id,
            message_type: message.message_type.clone(),
            payload: message.payload.clone(),
            timestamp_ms: self.now_ms,
        });
    }

    /// Resume bookkeeping: append the awaited result/event so the next
    /// replay runs past the old suspension point.
    pub(crate) fn append_resume_entry(&mut self, entry: JournalEntry) {
        self.append(entry);
    }

    pub fn record_decision(&mut self, description: &str, data: Value) {
        self.record_audit(JournalEntry::DecisionMade { description: description.to_string(), data });
    }

    pub fn record_context(&mut self, source: &str, data: Value) {
        self.record_audit(JournalEntry::ContextGathered { source: source.to_string(), data });
    }

    pub fn record_precedent(&mut self, reference: &str, data: Value) {
        self.record_audit(JournalEntry::PrecedentReferenced { reference: reference.to_string(), data });
    }

    pub fn record_outcome(&mut self, outcome: &str, data: Value) {
        self.record_audit(JournalEntry::DecisionOutcomeTracked { outcome: outcome.to_string(), data });
    }

    fn record_audit(&mut self, entry: JournalEntry) {
        // Audit entries are lineage, not replay state: replay skips them on
        // consume and must not duplicate them on the way through.
        if !self.is_replaying {
            self.append(entry);
        }
    }

    // ── compaction bookkeeping ──────────────────────────────────────────

    /// Whether the instance should snapshot+trim now. Compaction is
    /// advisory and rate-limited; it only runs between completed runs.
    pub fn should_compact(&self, now_ms: u64) -> bool {
        let threshold = self.config.journal_compaction_threshold;
        threshold > 0
            && self.entries.len() >= threshold
            && self.unpersisted().is_empty()
            && now_ms.saturating_sub(self.last_compaction_ms) > 5_000
    }

    /// Snapshot of the current state at the current cursor.
    pub fn snapshot(&self, now_ms: u64) -> Snapshot {
        Snapshot { state: self.state.clone(), cursor: self.cursor(), timestamp_ms: now_ms }
    }

    /// Drop the in-memory window after a successful snapshot+trim.
    pub fn apply_compaction(&mut self, now_ms: u64) {
        self.base_cursor = self.cursor();
        self.base_state = self.state.clone();
        self.entries.clear();
        self.persisted_len = 0;
        self.replay_pos = 0;
        self.last_compaction_ms = now_ms;
    }
}

/// Receipts and audit entries are recorded lineage; only primitive effects
/// participate in replay matching.
fn is_matchable(entry: &JournalEntry) -> bool {
    entry.is_replay_relevant() && !matches!(entry, JournalEntry::Invocation { .. })
}

#[cfg(test)]
#[path = "cell_tests.rs"]
mod tests;
