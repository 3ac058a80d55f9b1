// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable per-actor journal: append-only entry log plus snapshots

use crate::capability::{KvService, StreamBound, StreamEntryId, StreamService};
use crate::error::JournalError;
use loom_core::{ActorId, JournalEntry, Snapshot};
use serde::{Deserialize, Serialize};

/// One journaled entry with its global index.
///
/// Indices count all entries ever appended for the actor, including trimmed
/// ones, so a snapshot cursor stays meaningful after compaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub index: u64,
    pub entry: JournalEntry,
}

/// Journal store over the stream capability, with snapshots in KV.
#[derive(Clone)]
pub struct JournalStore<S, K> {
    streams: S,
    kv: K,
}

fn stream_key(actor_id: &ActorId) -> String {
    format!("journal:{actor_id}")
}

fn snapshot_key(actor_id: &ActorId) -> String {
    format!("journal:{actor_id}:snapshot")
}

impl<S, K> JournalStore<S, K>
where
    S: StreamService,
    K: KvService,
{
    pub fn new(streams: S, kv: K) -> Self {
        Self { streams, kv }
    }

    /// Append one entry at the given global index.
    ///
    /// The caller (the actor cell, serialized by the per-actor lock) owns
    /// index assignment, so appends are at-most-once per index.
    pub async fn append_entry(
        &self,
        actor_id: &ActorId,
        index: u64,
        entry: &JournalEntry,
    ) -> Result<(), JournalError> {
        let record = JournalRecord { index, entry: entry.clone() };
        let payload = serde_json::to_value(&record).map_err(crate::error::StoreError::from)?;
        self.streams.xadd(&stream_key(actor_id), payload).await?;
        Ok(())
    }

    /// All retained entries, oldest first.
    ///
    /// An entry that no longer parses is fatal to this actor's rehydration.
    pub async fn read_entries(&self, actor_id: &ActorId) -> Result<Vec<JournalRecord>, JournalError> {
        let entries = self
            .streams
            .xrange(&stream_key(actor_id), StreamBound::Min, StreamBound::Max)
            .await?;
        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let record: JournalRecord =
                serde_json::from_value(entry.payload).map_err(|e| JournalError::Corrupt {
                    actor_id: actor_id.clone(),
                    detail: format!("entry {} does not parse: {e}", entry.id),
                })?;
            records.push(record);
        }
        Ok(records)
    }

    pub async fn entry_count(&self, actor_id: &ActorId) -> Result<u64, JournalError> {
        Ok(self.streams.xlen(&stream_key(actor_id)).await?)
    }

    /// Newest retained entry, if any.
    pub async fn last_entry(&self, actor_id: &ActorId) -> Result<Option<JournalRecord>, JournalError> {
        let newest = self
            .streams
            .xrevrange(&stream_key(actor_id), StreamBound::Min, StreamBound::Max)
            .await?;
        let Some(entry) = newest.into_iter().next() else {
            return Ok(None);
        };
        let record: JournalRecord =
            serde_json::from_value(entry.payload).map_err(|e| JournalError::Corrupt {
                actor_id: actor_id.clone(),
                detail: format!("entry {} does not parse: {e}", entry.id),
            })?;
        Ok(Some(record))
    }

    pub async fn save_snapshot(
        &self,
        actor_id: &ActorId,
        snapshot: &Snapshot,
    ) -> Result<(), JournalError> {
        let value = serde_json::to_value(snapshot).map_err(crate::error::StoreError::from)?;
        self.kv.set(&snapshot_key(actor_id), value).await?;
        Ok(())
    }

    /// Latest snapshot, or `None` when absent or unparseable.
    ///
    /// A corrupt snapshot forces a full replay; it is never an error.
    pub async fn latest_snapshot(&self, actor_id: &ActorId) -> Result<Option<Snapshot>, JournalError> {
        let Some(value) = self.kv.get(&snapshot_key(actor_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<Snapshot>(value) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                tracing::warn!(actor_id = %actor_id, error = %e, "corrupt snapshot, forcing full replay");
                Ok(None)
            }
        }
    }

    /// Drop retained entries with global index below `before_cursor`.
    /// A cursor at or past the end trims everything. Returns dropped count.
    pub async fn trim_entries(
        &self,
        actor_id: &ActorId,
        before_cursor: u64,
    ) -> Result<u64, JournalError> {
        let key = stream_key(actor_id);
        let records = self.read_entries(actor_id).await?;
        let first_kept: Option<StreamEntryId> = {
            let entries = self
                .streams
                .xrange(&key, StreamBound::Min, StreamBound::Max)
                .await?;
            records
                .iter()
                .zip(entries.iter())
                .find(|(record, _)| record.index >= before_cursor)
                .map(|(_, entry)| entry.id)
        };
        match first_kept {
            Some(min_id) => Ok(self.streams.xtrim(&key, min_id).await?),
            None => {
                // Everything is below the cursor
                let len = self.streams.xlen(&key).await?;
                self.streams.del(&key).await?;
                Ok(len)
            }
        }
    }

    pub async fn delete_journal(&self, actor_id: &ActorId) -> Result<(), JournalError> {
        self.streams.del(&stream_key(actor_id)).await?;
        self.kv.del(&snapshot_key(actor_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
