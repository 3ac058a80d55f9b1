// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suspension sentinels

use loom_core::ActivityId;
use serde_json::Value;

/// Why an actor voluntarily yielded.
///
/// Not an error: the journal already records the suspension, so the runtime
/// acks the message and parks the instance until the awaited result arrives.
#[derive(Debug, Clone, PartialEq)]
pub enum Interrupt {
    /// Awaiting an activity result.
    Activity {
        activity_id: ActivityId,
        name: String,
        input: Value,
    },
    /// Awaiting an external event.
    Event { event_type: String },
}

impl std::fmt::Display for Interrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interrupt::Activity { activity_id, name, .. } => {
                write!(f, "awaiting activity {activity_id} ({name})")
            }
            Interrupt::Event { event_type } => write!(f, "awaiting event {event_type}"),
        }
    }
}
