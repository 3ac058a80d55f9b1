// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Counters, gauges, timings and component health probes

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub component: String,
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Point-in-time export of all recorded metrics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, u64>,
    pub gauges: HashMap<String, f64>,
    /// name → (count, total_ms, max_ms)
    pub timings: HashMap<String, TimingSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimingSummary {
    pub count: u64,
    pub total_ms: u64,
    pub max_ms: u64,
}

impl TimingSummary {
    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms as f64 / self.count as f64
        }
    }
}

type Probe = Box<dyn Fn() -> ComponentHealth + Send + Sync>;

/// Process-wide metrics sink. Cheap to record, summarized on export.
#[derive(Default)]
pub struct MetricsCollector {
    counters: Mutex<HashMap<String, u64>>,
    gauges: Mutex<HashMap<String, f64>>,
    timings: Mutex<HashMap<String, TimingSummary>>,
    probes: Mutex<Vec<Probe>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&self, name: &str) {
        self.incr_by(name, 1);
    }

    pub fn incr_by(&self, name: &str, delta: u64) {
        *self.counters.lock().entry(name.to_string()).or_insert(0) += delta;
    }

    pub fn gauge(&self, name: &str, value: f64) {
        self.gauges.lock().insert(name.to_string(), value);
    }

    pub fn time(&self, name: &str, elapsed_ms: u64) {
        let mut timings = self.timings.lock();
        let summary = timings.entry(name.to_string()).or_default();
        summary.count += 1;
        summary.total_ms += elapsed_ms;
        summary.max_ms = summary.max_ms.max(elapsed_ms);
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.lock().clone(),
            gauges: self.gauges.lock().clone(),
            timings: self.timings.lock().clone(),
        }
    }

    /// Register a health probe, polled on every `health()` call.
    pub fn register_probe<F>(&self, probe: F)
    where
        F: Fn() -> ComponentHealth + Send + Sync + 'static,
    {
        self.probes.lock().push(Box::new(probe));
    }

    /// Poll all probes. Overall status is the worst component status.
    pub fn health(&self) -> (HealthStatus, Vec<ComponentHealth>) {
        let components: Vec<ComponentHealth> =
            self.probes.lock().iter().map(|probe| probe()).collect();
        let overall = components
            .iter()
            .map(|c| c.status)
            .max_by_key(|status| match status {
                HealthStatus::Healthy => 0,
                HealthStatus::Degraded => 1,
                HealthStatus::Unhealthy => 2,
            })
            .unwrap_or(HealthStatus::Healthy);
        (overall, components)
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
