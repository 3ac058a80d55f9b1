// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotency record for exactly-once processing

use crate::id::{ActorId, MessageId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A keyed, TTL'd record associating an idempotency key with a previously
/// computed result. Within the TTL, a re-delivery with the same key returns
/// the cached result instead of re-invoking the actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: String,
    pub actor_id: ActorId,
    pub result: Value,
    pub executed_at_ms: u64,
    pub expires_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

impl IdempotencyRecord {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

#[cfg(test)]
#[path = "idempotency_tests.rs"]
mod tests;
