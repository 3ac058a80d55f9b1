// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Partitioned actor state blobs

use crate::capability::KvService;
use crate::error::StoreError;
use indexmap::IndexMap;
use loom_core::ActorId;
use serde_json::Value;

/// Actor state store over the KV capability, partitioned by actor id.
///
/// Holds the latest materialized state blob per actor. The journal remains
/// the source of truth; this is the fast path for reads that do not need a
/// replay.
#[derive(Clone)]
pub struct StateStore<K> {
    kv: K,
}

fn state_key(actor_id: &ActorId) -> String {
    format!("state:{actor_id}")
}

impl<K: KvService> StateStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub async fn save_state(
        &self,
        actor_id: &ActorId,
        state: &IndexMap<String, Value>,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(state)?;
        self.kv.set(&state_key(actor_id), value).await
    }

    pub async fn load_state(
        &self,
        actor_id: &ActorId,
    ) -> Result<Option<IndexMap<String, Value>>, StoreError> {
        let Some(value) = self.kv.get(&state_key(actor_id)).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(value)?))
    }

    pub async fn delete_state(&self, actor_id: &ActorId) -> Result<bool, StoreError> {
        self.kv.del(&state_key(actor_id)).await
    }

    /// Actor ids with persisted state (admin scans only).
    pub async fn actor_ids(&self) -> Result<Vec<ActorId>, StoreError> {
        let keys = self.kv.keys("state:").await?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix("state:").map(ActorId::new))
            .collect())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
