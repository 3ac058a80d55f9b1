// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn counters_accumulate() {
    let metrics = MetricsCollector::new();
    metrics.incr("jobs");
    metrics.incr("jobs");
    metrics.incr_by("jobs", 3);
    assert_eq!(metrics.counter("jobs"), 5);
    assert_eq!(metrics.counter("untouched"), 0);
}

#[test]
fn gauges_overwrite() {
    let metrics = MetricsCollector::new();
    metrics.gauge("queue_depth", 10.0);
    metrics.gauge("queue_depth", 4.0);
    assert_eq!(metrics.snapshot().gauges["queue_depth"], 4.0);
}

#[test]
fn timings_summarize() {
    let metrics = MetricsCollector::new();
    metrics.time("dispatch", 10);
    metrics.time("dispatch", 30);
    metrics.time("dispatch", 20);

    let summary = metrics.snapshot().timings["dispatch"];
    assert_eq!(summary.count, 3);
    assert_eq!(summary.total_ms, 60);
    assert_eq!(summary.max_ms, 30);
    assert_eq!(summary.mean_ms(), 20.0);
}

#[test]
fn health_is_worst_component() {
    let metrics = MetricsCollector::new();
    metrics.register_probe(|| ComponentHealth {
        component: "queue".to_string(),
        status: HealthStatus::Healthy,
        detail: None,
    });
    let (overall, components) = metrics.health();
    assert_eq!(overall, HealthStatus::Healthy);
    assert_eq!(components.len(), 1);

    metrics.register_probe(|| ComponentHealth {
        component: "journal".to_string(),
        status: HealthStatus::Degraded,
        detail: Some("slow appends".to_string()),
    });
    let (overall, _) = metrics.health();
    assert_eq!(overall, HealthStatus::Degraded);

    metrics.register_probe(|| ComponentHealth {
        component: "locks".to_string(),
        status: HealthStatus::Unhealthy,
        detail: None,
    });
    let (overall, components) = metrics.health();
    assert_eq!(overall, HealthStatus::Unhealthy);
    assert_eq!(components.len(), 3);
}

#[test]
fn empty_collector_is_healthy() {
    let metrics = MetricsCollector::new();
    let (overall, components) = metrics.health();
    assert_eq!(overall, HealthStatus::Healthy);
    assert!(components.is_empty());
}
