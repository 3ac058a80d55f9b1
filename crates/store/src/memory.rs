// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process reference implementations of the storage capabilities
//!
//! Used by tests and single-node deployments. All TTL handling is lazy:
//! expired keys are dropped when touched, driven by the injected [`Clock`].

use crate::capability::{
    DocQuery, DocumentService, KvService, StreamBound, StreamEntry, StreamEntryId, StreamInfo,
    StreamService,
};
use crate::error::StoreError;
use async_trait::async_trait;
use loom_core::Clock;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

// ── Streams ─────────────────────────────────────────────────────────────

struct StreamState {
    entries: Vec<StreamEntry>,
    last_id: StreamEntryId,
    expires_at_ms: Option<u64>,
}

/// In-memory stream service.
#[derive(Clone)]
pub struct MemoryStreams<C: Clock> {
    streams: Arc<Mutex<HashMap<String, StreamState>>>,
    clock: C,
}

impl<C: Clock> MemoryStreams<C> {
    pub fn new(clock: C) -> Self {
        Self { streams: Arc::new(Mutex::new(HashMap::new())), clock }
    }

    fn drop_if_expired(streams: &mut HashMap<String, StreamState>, key: &str, now_ms: u64) {
        if let Some(state) = streams.get(key) {
            if state.expires_at_ms.is_some_and(|at| now_ms >= at) {
                streams.remove(key);
            }
        }
    }
}

fn in_bounds(id: StreamEntryId, start: StreamBound, end: StreamBound) -> bool {
    let after_start = match start {
        StreamBound::Min => true,
        StreamBound::Max => false,
        StreamBound::Id(s) => id >= s,
        StreamBound::After(s) => id > s,
    };
    let before_end = match end {
        StreamBound::Min => false,
        StreamBound::Max => true,
        StreamBound::Id(e) => id <= e,
        StreamBound::After(e) => id > e,
    };
    after_start && before_end
}

#[async_trait]
impl<C: Clock + 'static> StreamService for MemoryStreams<C> {
    async fn xadd(&self, key: &str, payload: Value) -> Result<StreamEntryId, StoreError> {
        let now_ms = self.clock.epoch_ms();
        let mut streams = self.streams.lock();
        Self::drop_if_expired(&mut streams, key, now_ms);
        let state = streams.entry(key.to_string()).or_insert_with(|| StreamState {
            entries: Vec::new(),
            last_id: StreamEntryId::ZERO,
            expires_at_ms: None,
        });
        let id = if now_ms > state.last_id.ms {
            StreamEntryId { ms: now_ms, seq: 0 }
        } else {
            StreamEntryId { ms: state.last_id.ms, seq: state.last_id.seq + 1 }
        };
        state.last_id = id;
        state.entries.push(StreamEntry { id, payload });
        Ok(id)
    }

    async fn xrange(
        &self,
        key: &str,
        start: StreamBound,
        end: StreamBound,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        let now_ms = self.clock.epoch_ms();
        let mut streams = self.streams.lock();
        Self::drop_if_expired(&mut streams, key, now_ms);
        Ok(streams
            .get(key)
            .map(|state| {
                state
                    .entries
                    .iter()
                    .filter(|e| in_bounds(e.id, start, end))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn xrevrange(
        &self,
        key: &str,
        start: StreamBound,
        end: StreamBound,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        let mut entries = self.xrange(key, start, end).await?;
        entries.reverse();
        Ok(entries)
    }

    async fn xtrim(&self, key: &str, min_id: StreamEntryId) -> Result<u64, StoreError> {
        let mut streams = self.streams.lock();
        let Some(state) = streams.get_mut(key) else {
            return Ok(0);
        };
        let before = state.entries.len();
        state.entries.retain(|e| e.id >= min_id);
        Ok((before - state.entries.len()) as u64)
    }

    async fn xlen(&self, key: &str) -> Result<u64, StoreError> {
        let now_ms = self.clock.epoch_ms();
        let mut streams = self.streams.lock();
        Self::drop_if_expired(&mut streams, key, now_ms);
        Ok(streams.get(key).map(|s| s.entries.len() as u64).unwrap_or(0))
    }

    async fn xinfo(&self, key: &str) -> Result<Option<StreamInfo>, StoreError> {
        let streams = self.streams.lock();
        Ok(streams.get(key).map(|state| StreamInfo {
            length: state.entries.len() as u64,
            first_id: state.entries.first().map(|e| e.id),
            last_id: state.entries.last().map(|e| e.id),
        }))
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.streams.lock().remove(key).is_some())
    }

    async fn expire_at(&self, key: &str, at_epoch_ms: u64) -> Result<(), StoreError> {
        if let Some(state) = self.streams.lock().get_mut(key) {
            state.expires_at_ms = Some(at_epoch_ms);
        }
        Ok(())
    }
}

// ── KV ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct KvState {
    strings: HashMap<String, Value>,
    lists: HashMap<String, Vec<Value>>,
    hashes: HashMap<String, HashMap<String, Value>>,
    sets: HashMap<String, Vec<String>>,
}

/// In-memory KV service.
#[derive(Clone)]
pub struct MemoryKv {
    state: Arc<Mutex<KvState>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(KvState::default())) }
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvService for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.state.lock().strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.state.lock().strings.insert(key.to_string(), value);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        let hit = state.strings.remove(key).is_some()
            | state.lists.remove(key).is_some()
            | state.hashes.remove(key).is_some()
            | state.sets.remove(key).is_some();
        Ok(hit)
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock();
        let mut keys: Vec<String> = state
            .strings
            .keys()
            .chain(state.lists.keys())
            .chain(state.hashes.keys())
            .chain(state.sets.keys())
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn lpush(&self, key: &str, value: Value) -> Result<u64, StoreError> {
        let mut state = self.state.lock();
        let list = state.lists.entry(key.to_string()).or_default();
        list.insert(0, value);
        Ok(list.len() as u64)
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Value>, StoreError> {
        let state = self.state.lock();
        let Some(list) = state.lists.get(key).filter(|l| !l.is_empty()) else {
            return Ok(Vec::new());
        };
        let len = list.len() as i64;
        let norm = |i: i64| if i < 0 { len + i } else { i };
        let start = norm(start).max(0);
        let stop = norm(stop).min(len - 1);
        if start > stop {
            return Ok(Vec::new());
        }
        Ok(list[start as usize..=stop as usize].to_vec())
    }

    async fn lpop(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut state = self.state.lock();
        Ok(state.lists.get_mut(key).filter(|l| !l.is_empty()).map(|l| l.remove(0)))
    }

    async fn hset(&self, key: &str, field: &str, value: Value) -> Result<(), StoreError> {
        self.state
            .lock()
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .state
            .lock()
            .hashes
            .get(key)
            .and_then(|h| h.get(field))
            .cloned())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, Value>, StoreError> {
        Ok(self.state.lock().hashes.get(key).cloned().unwrap_or_default())
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        let mut state = self.state.lock();
        let hash = state.hashes.entry(key.to_string()).or_default();
        let current = hash.get(field).and_then(Value::as_i64).unwrap_or(0);
        let next = current + delta;
        hash.insert(field.to_string(), Value::from(next));
        Ok(next)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        let set = state.sets.entry(key.to_string()).or_default();
        if set.iter().any(|m| m == member) {
            Ok(false)
        } else {
            set.push(member.to_string());
            Ok(true)
        }
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        let Some(set) = state.sets.get_mut(key) else {
            return Ok(false);
        };
        let before = set.len();
        set.retain(|m| m != member);
        Ok(set.len() < before)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.state.lock().sets.get(key).cloned().unwrap_or_default())
    }
}

// ── Documents ───────────────────────────────────────────────────────────

struct Doc {
    partition_key: String,
    body: Value,
    expires_at_ms: Option<u64>,
}

/// In-memory document service. Collections map `(partition_key, id)` → doc.
#[derive(Clone)]
pub struct MemoryDocs<C: Clock> {
    collections: Arc<Mutex<HashMap<String, HashMap<(String, String), Doc>>>>,
    clock: C,
}

impl<C: Clock> MemoryDocs<C> {
    pub fn new(clock: C) -> Self {
        Self { collections: Arc::new(Mutex::new(HashMap::new())), clock }
    }
}

fn matches(doc: &Value, query: &DocQuery) -> bool {
    for (field, expected) in &query.equals {
        if doc.get(field) != Some(expected) {
            return false;
        }
    }
    if let Some((field, min, max)) = &query.range {
        let Some(n) = doc.get(field).and_then(Value::as_u64) else {
            return false;
        };
        if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
            return false;
        }
    }
    true
}

#[async_trait]
impl<C: Clock + 'static> DocumentService for MemoryDocs<C> {
    async fn upsert(
        &self,
        collection: &str,
        partition_key: &str,
        id: &str,
        doc: Value,
        expires_at_ms: Option<u64>,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.lock();
        collections.entry(collection.to_string()).or_default().insert(
            (partition_key.to_string(), id.to_string()),
            Doc { partition_key: partition_key.to_string(), body: doc, expires_at_ms },
        );
        Ok(())
    }

    async fn get(
        &self,
        collection: &str,
        partition_key: &str,
        id: &str,
    ) -> Result<Option<Value>, StoreError> {
        let now_ms = self.clock.epoch_ms();
        let collections = self.collections.lock();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(&(partition_key.to_string(), id.to_string())))
            .filter(|doc| !doc.expires_at_ms.is_some_and(|at| now_ms >= at))
            .map(|doc| doc.body.clone()))
    }

    async fn query(&self, collection: &str, query: DocQuery) -> Result<Vec<Value>, StoreError> {
        let now_ms = self.clock.epoch_ms();
        let collections = self.collections.lock();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<&Doc> = docs
            .values()
            .filter(|doc| !doc.expires_at_ms.is_some_and(|at| now_ms >= at))
            .filter(|doc| {
                query
                    .partition_key
                    .as_ref()
                    .is_none_or(|pk| &doc.partition_key == pk)
            })
            .filter(|doc| matches(&doc.body, &query))
            .collect();
        if let Some(field) = &query.order_by {
            hits.sort_by_key(|doc| doc.body.get(field).and_then(Value::as_u64).unwrap_or(0));
        }
        let mut bodies: Vec<Value> = hits.into_iter().map(|doc| doc.body.clone()).collect();
        if let Some(limit) = query.limit {
            bodies.truncate(limit);
        }
        Ok(bodies)
    }

    async fn delete(
        &self,
        collection: &str,
        partition_key: &str,
        id: &str,
    ) -> Result<bool, StoreError> {
        let mut collections = self.collections.lock();
        Ok(collections
            .get_mut(collection)
            .map(|docs| {
                docs.remove(&(partition_key.to_string(), id.to_string()))
                    .is_some()
            })
            .unwrap_or(false))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
