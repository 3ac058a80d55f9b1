// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leased distributed locks

use crate::capability::KvService;
use crate::error::StoreError;
use loom_core::{Clock, LockToken};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A held lease. The fencing token ties extend/release to the acquisition
/// that produced it, so operating on an expired-and-reacquired lock is a
/// no-op instead of a theft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub key: String,
    pub token: LockToken,
    pub expires_at_ms: u64,
}

#[derive(Serialize, Deserialize)]
struct LockState {
    token: LockToken,
    expires_at_ms: u64,
}

/// Lock manager over the KV capability.
#[derive(Clone)]
pub struct LockManager<K, C> {
    kv: K,
    clock: C,
}

fn lock_key(key: &str) -> String {
    format!("lock:{key}")
}

impl<K, C> LockManager<K, C>
where
    K: KvService,
    C: Clock,
{
    pub fn new(kv: K, clock: C) -> Self {
        Self { kv, clock }
    }

    /// Acquire the lock for `ttl_ms`, or `None` if someone else holds an
    /// unexpired lease.
    pub async fn acquire(&self, key: &str, ttl_ms: u64) -> Result<Option<Lease>, StoreError> {
        let now_ms = self.clock.epoch_ms();
        if let Some(value) = self.kv.get(&lock_key(key)).await? {
            if let Ok(state) = serde_json::from_value::<LockState>(value) {
                if state.expires_at_ms > now_ms {
                    return Ok(None);
                }
            }
        }
        let token = LockToken::new();
        let expires_at_ms = now_ms + ttl_ms;
        self.kv
            .set(&lock_key(key), json!({"token": token, "expires_at_ms": expires_at_ms}))
            .await?;
        Ok(Some(Lease { key: key.to_string(), token, expires_at_ms }))
    }

    /// Extend a held lease. Returns false (no-op) when the lease expired and
    /// was lost or rotated.
    pub async fn extend(&self, lease: &mut Lease, ttl_ms: u64) -> Result<bool, StoreError> {
        let now_ms = self.clock.epoch_ms();
        let Some(value) = self.kv.get(&lock_key(&lease.key)).await? else {
            return Ok(false);
        };
        let Ok(state) = serde_json::from_value::<LockState>(value) else {
            return Ok(false);
        };
        if state.token != lease.token || state.expires_at_ms <= now_ms {
            return Ok(false);
        }
        let expires_at_ms = now_ms + ttl_ms;
        self.kv
            .set(
                &lock_key(&lease.key),
                json!({"token": lease.token, "expires_at_ms": expires_at_ms}),
            )
            .await?;
        lease.expires_at_ms = expires_at_ms;
        Ok(true)
    }

    /// Release a held lease. Releasing an expired or rotated lease is a
    /// no-op.
    pub async fn release(&self, lease: Lease) -> Result<(), StoreError> {
        let Some(value) = self.kv.get(&lock_key(&lease.key)).await? else {
            return Ok(());
        };
        let Ok(state) = serde_json::from_value::<LockState>(value) else {
            return Ok(());
        };
        if state.token == lease.token {
            self.kv.del(&lock_key(&lease.key)).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
