// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference-bearing span events
//!
//! Spans carry pointers into journals, state, messages and the idempotency
//! cache, never payload copies. A reader dereferences against the owning
//! store when it needs the data.

use crate::id::{ActorId, MessageId, QueueName, SpanId, TraceId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Pointer to one journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRef {
    pub actor_id: ActorId,
    pub entry_index: u64,
    pub entry_type: String,
}

/// Pointer to a queued message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRef {
    pub message_id: MessageId,
    pub queue_name: QueueName,
    pub correlation_id: String,
}

/// Pointer to an actor's persisted state blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRef {
    pub actor_id: ActorId,
    /// Journal cursor the state was current at.
    pub cursor: u64,
}

/// Pointer to an idempotency record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRef {
    pub key: String,
    pub actor_id: ActorId,
}

/// The reference set attached to one span event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpanRefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_state: Option<StateRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal_entry: Option<JournalRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency: Option<IdempotencyRef>,
}

impl SpanRefs {
    pub fn is_empty(&self) -> bool {
        self.actor_state.is_none()
            && self.journal_entry.is_none()
            && self.message.is_none()
            && self.idempotency.is_none()
    }
}

/// Outcome recorded on a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    Ok,
    Error,
}

/// One span event in a distributed trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<SpanId>,
    /// e.g. "message_received", "message_deduplicated", "activity_scheduled"
    pub event_type: String,
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SpanStatus>,
    #[serde(default, skip_serializing_if = "SpanRefs::is_empty")]
    pub refs: SpanRefs,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

impl SpanEvent {
    pub fn new(trace_id: TraceId, event_type: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            trace_id,
            span_id: SpanId::new(),
            parent_span_id: None,
            event_type: event_type.into(),
            timestamp_ms,
            status: None,
            refs: SpanRefs::default(),
            metadata: Value::Null,
            tags: HashMap::new(),
        }
    }

    /// Derive a child span in the same trace.
    pub fn child(&self, event_type: impl Into<String>, timestamp_ms: u64) -> Self {
        let mut span = SpanEvent::new(self.trace_id, event_type, timestamp_ms);
        span.parent_span_id = Some(self.span_id);
        span
    }

    pub fn with_status(mut self, status: SpanStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_refs(mut self, refs: SpanRefs) -> Self {
        self.refs = refs;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status == Some(SpanStatus::Error)
    }
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
