// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Actor instance: durability around the in-memory cell
//!
//! Hydrates the cell from snapshot + journal, flushes newly appended entries
//! after each run, and drives advisory compaction. Journal-append failures
//! are logged and retried on the next flush; they never abort user
//! execution, because the cell's in-memory window is authoritative until
//! persisted.

use crate::actor::{run_replay, Actor, ExecuteOutcome};
use crate::cell::ActorCell;
use crate::error::ActorError;
use loom_core::{ActivityId, ActorConfig, ActorContext, Clock, JournalEntry, Message};
use loom_store::{JournalStore, KvService, StreamService};
use serde_json::Value;
use std::sync::Arc;

pub struct ActorInstance<S, K, C> {
    actor: Arc<dyn Actor>,
    cell: ActorCell,
    journal: JournalStore<S, K>,
    clock: C,
}

impl<S, K, C> ActorInstance<S, K, C>
where
    S: StreamService,
    K: KvService,
    C: Clock,
{
    /// Activate an actor: load the latest snapshot and the trailing journal,
    /// hydrate state, and hold the instance ready for dispatch.
    pub async fn activate(
        actor: Arc<dyn Actor>,
        context: ActorContext,
        config: ActorConfig,
        journal: JournalStore<S, K>,
        clock: C,
    ) -> Result<Self, ActorError> {
        let snapshot = journal.latest_snapshot(&context.actor_id).await?;
        let cursor = snapshot.as_ref().map(|s| s.cursor).unwrap_or(0);
        let mut records = journal.read_entries(&context.actor_id).await?;
        // Entries below the snapshot cursor are trim leftovers; the snapshot
        // already covers them.
        records.retain(|r| r.index >= cursor);
        let cell = ActorCell::hydrate(context, config, snapshot, records);
        Ok(Self { actor, cell, journal, clock })
    }

    pub fn cell(&self) -> &ActorCell {
        &self.cell
    }

    pub fn cell_mut(&mut self) -> &mut ActorCell {
        &mut self.cell
    }

    /// Process one inbound message: journal the invocation receipt, re-run
    /// `execute` over the recorded history, and flush new entries.
    pub async fn handle_message(&mut self, message: &Message) -> Result<ExecuteOutcome, ActorError> {
        self.cell.set_now_ms(self.clock.epoch_ms());
        self.cell.record_invocation(message);
        let result = run_replay(&*self.actor, &mut self.cell, Some(&message.payload));
        self.flush().await;
        let outcome = result?;
        if matches!(outcome, ExecuteOutcome::Completed(_)) {
            self.maybe_compact().await;
        }
        Ok(outcome)
    }

    /// Deliver an awaited external event, then re-run `execute` from scratch
    /// so the replay advances past the old suspension point.
    pub async fn resume(
        &mut self,
        event_type: &str,
        data: Value,
    ) -> Result<ExecuteOutcome, ActorError> {
        self.cell.set_now_ms(self.clock.epoch_ms());
        self.cell.append_resume_entry(JournalEntry::EventReceived {
            event_type: event_type.to_string(),
            payload: data,
        });
        self.rerun().await
    }

    /// Deliver an activity result.
    pub async fn resume_with_activity(
        &mut self,
        activity_id: ActivityId,
        result: Value,
    ) -> Result<ExecuteOutcome, ActorError> {
        self.require_pending_activity(&activity_id)?;
        self.cell.set_now_ms(self.clock.epoch_ms());
        self.cell
            .append_resume_entry(JournalEntry::ActivityCompleted { activity_id, result });
        self.rerun().await
    }

    /// Deliver an activity failure; replay rethrows it at the call site.
    pub async fn resume_with_activity_error(
        &mut self,
        activity_id: ActivityId,
        error: &str,
    ) -> Result<ExecuteOutcome, ActorError> {
        self.require_pending_activity(&activity_id)?;
        self.cell.set_now_ms(self.clock.epoch_ms());
        self.cell.append_resume_entry(JournalEntry::ActivityFailed {
            activity_id,
            error: error.to_string(),
        });
        self.rerun().await
    }

    fn require_pending_activity(&self, activity_id: &ActivityId) -> Result<(), ActorError> {
        let scheduled = self.cell.entries().iter().any(|r| {
            matches!(&r.entry, JournalEntry::ActivityScheduled { activity_id: id, .. } if id == activity_id)
        });
        let resolved = self.cell.entries().iter().any(|r| match &r.entry {
            JournalEntry::ActivityCompleted { activity_id: id, .. }
            | JournalEntry::ActivityFailed { activity_id: id, .. } => id == activity_id,
            _ => false,
        });
        if !scheduled || resolved {
            return Err(ActorError::Execution(format!(
                "no pending activity {activity_id}"
            )));
        }
        Ok(())
    }

    async fn rerun(&mut self) -> Result<ExecuteOutcome, ActorError> {
        let result = run_replay(&*self.actor, &mut self.cell, None);
        self.flush().await;
        let outcome = result?;
        if matches!(outcome, ExecuteOutcome::Completed(_)) {
            self.maybe_compact().await;
        }
        Ok(outcome)
    }

    /// Persist entries appended since the last flush. Failures are logged
    /// and left for the next flush; they must not abort execution.
    pub async fn flush(&mut self) {
        let actor_id = self.cell.context().actor_id.clone();
        let pending: Vec<_> = self.cell.unpersisted().to_vec();
        let mut stored = 0;
        for record in &pending {
            match self.journal.append_entry(&actor_id, record.index, &record.entry).await {
                Ok(()) => stored += 1,
                Err(e) => {
                    tracing::warn!(
                        actor_id = %actor_id,
                        index = record.index,
                        error = %e,
                        "journal append failed, will re-journal on next flush"
                    );
                    break;
                }
            }
        }
        self.cell.mark_persisted(stored);
    }

    /// Advisory compaction: snapshot at the current cursor, trim the stored
    /// journal, drop the in-memory window. Any failure is logged and skipped.
    pub async fn maybe_compact(&mut self) {
        let now_ms = self.clock.epoch_ms();
        if !self.cell.should_compact(now_ms) {
            return;
        }
        let actor_id = self.cell.context().actor_id.clone();
        let snapshot = self.cell.snapshot(now_ms);
        if let Err(e) = self.journal.save_snapshot(&actor_id, &snapshot).await {
            tracing::warn!(actor_id = %actor_id, error = %e, "snapshot failed, skipping compaction");
            return;
        }
        if let Err(e) = self.journal.trim_entries(&actor_id, snapshot.cursor).await {
            // The snapshot is authoritative; stale entries below its cursor
            // are ignored at activation.
            tracing::warn!(actor_id = %actor_id, error = %e, "journal trim failed");
        }
        self.cell.apply_compaction(now_ms);
        tracing::debug!(actor_id = %actor_id, cursor = snapshot.cursor, "journal compacted");
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
