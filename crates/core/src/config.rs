// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-actor-type infrastructure policy

use serde::{Deserialize, Serialize};

/// Hard execution ceiling for one invocation, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Backoff shape used between delivery attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    Exponential,
    Linear,
    Fixed,
}

/// Delivery ordering for one actor type's messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageOrdering {
    /// In-order dispatch per actor id.
    Fifo,
    /// Best-effort; siblings may be reordered.
    Standard,
}

/// How long an idle instance survives pool pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPriority {
    /// Evicted first.
    Low,
    Medium,
    /// Kept longest.
    High,
}

/// Retry shaping for failed deliveries.
///
/// `max_attempts` counts the first delivery: 3 means one initial attempt
/// plus two retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff")]
    pub backoff: Backoff,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: default_backoff(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff() -> Backoff {
    Backoff::Exponential
}
fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    60_000
}
fn default_multiplier() -> f64 {
    2.0
}

/// Infrastructure policy for one registered actor type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Hard execution ceiling per invocation, ms.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    /// Seconds an idempotency record stays in the cache.
    #[serde(default = "default_idempotency_ttl_secs")]
    pub idempotency_ttl_secs: u64,
    #[serde(default = "default_ordering")]
    pub message_ordering: MessageOrdering,
    #[serde(default = "default_eviction")]
    pub eviction_priority: EvictionPriority,
    /// When true, terminal failures route to the dead-letter queue.
    #[serde(default = "default_true")]
    pub dead_letter_queue: bool,
    /// Max concurrent in-flight invocations for this actor type.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Journal length that triggers a compaction snapshot.
    #[serde(default = "default_compaction_threshold")]
    pub journal_compaction_threshold: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retry_policy: RetryPolicy::default(),
            idempotency_ttl_secs: default_idempotency_ttl_secs(),
            message_ordering: default_ordering(),
            eviction_priority: default_eviction(),
            dead_letter_queue: default_true(),
            concurrency: default_concurrency(),
            journal_compaction_threshold: default_compaction_threshold(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}
fn default_idempotency_ttl_secs() -> u64 {
    86_400
}
fn default_ordering() -> MessageOrdering {
    MessageOrdering::Standard
}
fn default_eviction() -> EvictionPriority {
    EvictionPriority::Medium
}
fn default_true() -> bool {
    true
}
fn default_concurrency() -> usize {
    1
}
fn default_compaction_threshold() -> usize {
    100
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
