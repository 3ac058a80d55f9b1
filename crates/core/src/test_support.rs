// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{ActivityId, JournalEntry, Message, MessageId, StatePatch};
use serde_json::json;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core journal types.
pub mod strategies {
    use crate::journal::StatePatch;
    use proptest::prelude::*;

    pub fn arb_json_leaf() -> impl Strategy<Value = serde_json::Value> {
        prop_oneof![
            Just(serde_json::Value::Null),
            any::<bool>().prop_map(serde_json::Value::from),
            any::<i64>().prop_map(serde_json::Value::from),
            "[a-z]{0,12}".prop_map(serde_json::Value::from),
        ]
    }

    pub fn arb_state_patch() -> impl Strategy<Value = StatePatch> {
        (
            "[a-z]{1,8}",
            proptest::option::of(arb_json_leaf()),
            proptest::option::of(arb_json_leaf()),
        )
            .prop_map(|(key, value, prev)| StatePatch { key, value, prev })
    }
}

// ── Factory functions ───────────────────────────────────────────────────

pub fn test_message(actor_id: &str, message_type: &str) -> Message {
    let mut message = Message::new(actor_id, message_type, json!({"n": 1}));
    message.message_id = MessageId::from_string(format!("msg-{message_type}"));
    message.metadata.timestamp_ms = 1_000_000;
    message
}

pub fn invocation_entry(message_type: &str) -> JournalEntry {
    JournalEntry::Invocation {
        message_id: MessageId::from_string(format!("msg-{message_type}")),
        message_type: message_type.to_string(),
        payload: json!({"n": 1}),
        timestamp_ms: 1_000_000,
    }
}

pub fn set_patch(key: &str, value: serde_json::Value) -> StatePatch {
    StatePatch { key: key.to_string(), value: Some(value), prev: None }
}

pub fn activity_scheduled_entry(n: u64, name: &str) -> JournalEntry {
    JournalEntry::ActivityScheduled {
        activity_id: ActivityId::from_counter(n),
        name: name.to_string(),
        input: json!({}),
    }
}

pub fn activity_completed_entry(n: u64, result: serde_json::Value) -> JournalEntry {
    JournalEntry::ActivityCompleted { activity_id: ActivityId::from_counter(n), result }
}
