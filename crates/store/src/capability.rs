// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Abstract storage capabilities
//!
//! Three seams the runtime is written against: a redis-like append-only
//! stream service, a KV service, and a document service with partition-key
//! queries and TTL. Concrete engines are external collaborators; the traits
//! here pin down exactly the semantics the stores rely on.

use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Entry id within one stream: `(millis, seq)`, rendered as "millis-seq".
///
/// Ordering is total per stream: ids are assigned monotonically by the
/// service at append time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamEntryId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamEntryId {
    pub const ZERO: StreamEntryId = StreamEntryId { ms: 0, seq: 0 };

    pub fn parse(s: &str) -> Option<Self> {
        let (ms, seq) = match s.split_once('-') {
            Some((ms, seq)) => (ms.parse().ok()?, seq.parse().ok()?),
            None => (s.parse().ok()?, 0),
        };
        Some(Self { ms, seq })
    }
}

impl std::fmt::Display for StreamEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// One appended stream entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub id: StreamEntryId,
    pub payload: Value,
}

/// Inclusive range bound for `xrange`/`xrevrange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamBound {
    Min,
    Max,
    Id(StreamEntryId),
    /// Exclusive: entries strictly after the id.
    After(StreamEntryId),
}

/// Stream metadata as reported by `xinfo`.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub length: u64,
    pub first_id: Option<StreamEntryId>,
    pub last_id: Option<StreamEntryId>,
}

/// Append-only stream capability (`xadd`/`xrange`/`xtrim`/`xlen`/`xinfo`).
#[async_trait]
pub trait StreamService: Send + Sync + 'static {
    /// Append one entry; the service assigns a monotonically increasing id.
    async fn xadd(&self, key: &str, payload: Value) -> Result<StreamEntryId, StoreError>;

    /// Entries within `[start, end]`, oldest first.
    async fn xrange(
        &self,
        key: &str,
        start: StreamBound,
        end: StreamBound,
    ) -> Result<Vec<StreamEntry>, StoreError>;

    /// Entries within `[start, end]`, newest first.
    async fn xrevrange(
        &self,
        key: &str,
        start: StreamBound,
        end: StreamBound,
    ) -> Result<Vec<StreamEntry>, StoreError>;

    /// Drop entries with id strictly below `min_id`; returns dropped count.
    async fn xtrim(&self, key: &str, min_id: StreamEntryId) -> Result<u64, StoreError>;

    async fn xlen(&self, key: &str) -> Result<u64, StoreError>;

    async fn xinfo(&self, key: &str) -> Result<Option<StreamInfo>, StoreError>;

    /// Delete the whole stream.
    async fn del(&self, key: &str) -> Result<bool, StoreError>;

    /// Expire the whole stream at the given epoch instant.
    async fn expire_at(&self, key: &str, at_epoch_ms: u64) -> Result<(), StoreError>;
}

/// KV capability with string keys, JSON values, lists, hashes and sets.
#[async_trait]
pub trait KvService: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    async fn del(&self, key: &str) -> Result<bool, StoreError>;
    /// Keys with the given prefix (admin scans only; not a hot path).
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    async fn lpush(&self, key: &str, value: Value) -> Result<u64, StoreError>;
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Value>, StoreError>;
    async fn lpop(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn hset(&self, key: &str, field: &str, value: Value) -> Result<(), StoreError>;
    async fn hget(&self, key: &str, field: &str) -> Result<Option<Value>, StoreError>;
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, Value>, StoreError>;
    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError>;

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, StoreError>;
    async fn srem(&self, key: &str, member: &str) -> Result<bool, StoreError>;
    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError>;
}

/// Query over one document collection.
///
/// `partition_key = None` scans across partitions (cross-trace filters);
/// everything else narrows within the scan.
#[derive(Debug, Clone, Default)]
pub struct DocQuery {
    pub partition_key: Option<String>,
    /// Top-level field equality filters.
    pub equals: Vec<(String, Value)>,
    /// Numeric range filter: `(field, min inclusive, max inclusive)`.
    pub range: Option<(String, Option<u64>, Option<u64>)>,
    /// Top-level numeric field to order by, ascending.
    pub order_by: Option<String>,
    pub limit: Option<usize>,
}

impl DocQuery {
    pub fn partition(key: impl Into<String>) -> Self {
        Self { partition_key: Some(key.into()), ..Self::default() }
    }

    pub fn field_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.equals.push((field.into(), value));
        self
    }

    pub fn field_range(
        mut self,
        field: impl Into<String>,
        min: Option<u64>,
        max: Option<u64>,
    ) -> Self {
        self.range = Some((field.into(), min, max));
        self
    }

    pub fn ordered_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Document capability with partition-key queries and per-document TTL.
#[async_trait]
pub trait DocumentService: Send + Sync + 'static {
    async fn upsert(
        &self,
        collection: &str,
        partition_key: &str,
        id: &str,
        doc: Value,
        expires_at_ms: Option<u64>,
    ) -> Result<(), StoreError>;

    async fn get(
        &self,
        collection: &str,
        partition_key: &str,
        id: &str,
    ) -> Result<Option<Value>, StoreError>;

    async fn query(&self, collection: &str, query: DocQuery) -> Result<Vec<Value>, StoreError>;

    async fn delete(
        &self,
        collection: &str,
        partition_key: &str,
        id: &str,
    ) -> Result<bool, StoreError>;
}

#[cfg(test)]
#[path = "capability_tests.rs"]
mod tests;
