// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-invocation actor context

use crate::id::{ActorId, ActorType, TraceId};
use serde::{Deserialize, Serialize};

/// Identity and ambient metadata for one actor invocation.
///
/// Created per invocation by the runtime and immutable for its duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorContext {
    pub actor_id: ActorId,
    pub actor_type: ActorType,
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_trace_id: Option<TraceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl ActorContext {
    pub fn new(actor_id: impl Into<ActorId>, actor_type: impl Into<ActorType>) -> Self {
        Self {
            actor_id: actor_id.into(),
            actor_type: actor_type.into(),
            correlation_id: String::new(),
            parent_trace_id: None,
            tenant_id: None,
            client_id: None,
            environment: None,
        }
    }

    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn with_parent_trace(mut self, trace_id: TraceId) -> Self {
        self.parent_trace_id = Some(trace_id);
        self
    }
}
