// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue message envelope

use crate::id::{ActorId, MessageId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Delivery metadata carried alongside a message payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub timestamp_ms: u64,
    /// Higher dequeues first; FIFO within one priority band.
    #[serde(default)]
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    /// 1-based, set by the queue on each delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_attempt: Option<u32>,
}

/// One message addressed to an actor.
///
/// Produced by senders, consumed by exactly one worker, acknowledged after
/// processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    pub actor_id: ActorId,
    pub message_type: String,
    pub correlation_id: String,
    pub payload: Value,
    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl Message {
    pub fn new(
        actor_id: impl Into<ActorId>,
        message_type: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            message_id: MessageId::new(),
            actor_id: actor_id.into(),
            message_type: message_type.into(),
            correlation_id: String::new(),
            payload,
            metadata: MessageMetadata::default(),
        }
    }

    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.metadata.idempotency_key = Some(key.into());
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.metadata.priority = priority;
        self
    }

    /// One-line summary for logs
    pub fn log_summary(&self) -> String {
        format!(
            "msg={} actor={} kind={} attempt={}",
            self.message_id,
            self.actor_id,
            self.message_type,
            self.metadata.delivery_attempt.unwrap_or(1),
        )
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
