// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress/token stream chunks

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One chunk in a progress or token stream.
///
/// Serializes with `{"type": "kind", ...fields}` format. `complete` and
/// `error` are terminal: the producer sets a TTL on the topic when it writes
/// one, and consumers stop iterating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamChunk {
    #[serde(rename = "start")]
    Start { timestamp_ms: u64 },

    #[serde(rename = "progress")]
    Progress {
        current: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    #[serde(rename = "data")]
    Data { payload: Value },

    #[serde(rename = "complete")]
    Complete { timestamp_ms: u64 },

    #[serde(rename = "error")]
    Error { error: String },
}

impl StreamChunk {
    /// Terminal chunks end the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamChunk::Complete { .. } | StreamChunk::Error { .. })
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
