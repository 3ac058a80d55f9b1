// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic retry delay calculation

use crate::config::{Backoff, RetryPolicy};
use std::time::Duration;

/// Delay before the next delivery after `attempt` failed attempts.
///
/// `attempt` is 1-based: the delay after the first failed attempt is
/// computed with `attempt = 1`. The result depends only on `(policy,
/// attempt)` so that retries are reproducible across workers and restarts.
pub fn calculate_retry_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let attempt = attempt.max(1);
    let delay_ms = match policy.backoff {
        Backoff::Exponential => {
            let factor = policy.multiplier.powi(attempt as i32 - 1);
            let raw = policy.initial_delay_ms as f64 * factor;
            if raw >= policy.max_delay_ms as f64 {
                policy.max_delay_ms
            } else {
                raw as u64
            }
        }
        Backoff::Linear => (policy.initial_delay_ms)
            .saturating_mul(attempt as u64)
            .min(policy.max_delay_ms),
        Backoff::Fixed => policy.initial_delay_ms.min(policy.max_delay_ms),
    };
    Duration::from_millis(delay_ms)
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
