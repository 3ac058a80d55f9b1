// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TTL'd idempotency record cache

use crate::capability::KvService;
use crate::error::StoreError;
use loom_core::{Clock, IdempotencyRecord};

/// Keyed record cache over the KV capability. Expiry is lazy: an expired
/// record reads as a miss and is purged on touch.
#[derive(Clone)]
pub struct IdempotencyStore<K, C> {
    kv: K,
    clock: C,
}

fn record_key(key: &str) -> String {
    format!("idempotency:{key}")
}

impl<K, C> IdempotencyStore<K, C>
where
    K: KvService,
    C: Clock,
{
    pub fn new(kv: K, clock: C) -> Self {
        Self { kv, clock }
    }

    pub async fn put(&self, record: &IdempotencyRecord) -> Result<(), StoreError> {
        let value = serde_json::to_value(record)?;
        self.kv.set(&record_key(&record.key), value).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<IdempotencyRecord>, StoreError> {
        let Some(value) = self.kv.get(&record_key(key)).await? else {
            return Ok(None);
        };
        let record: IdempotencyRecord = serde_json::from_value(value)?;
        if record.is_expired(self.clock.epoch_ms()) {
            self.kv.del(&record_key(key)).await?;
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Drop all expired records; returns purged count. Admin/maintenance path.
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now_ms = self.clock.epoch_ms();
        let mut purged = 0;
        for key in self.kv.keys("idempotency:").await? {
            let Some(value) = self.kv.get(&key).await? else {
                continue;
            };
            let expired = serde_json::from_value::<IdempotencyRecord>(value)
                .map(|r| r.is_expired(now_ms))
                .unwrap_or(true);
            if expired {
                self.kv.del(&key).await?;
                purged += 1;
            }
        }
        Ok(purged)
    }
}

#[cfg(test)]
#[path = "idempotency_tests.rs"]
mod tests;
