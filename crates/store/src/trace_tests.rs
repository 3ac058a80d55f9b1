// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::capability::DocumentService;
use crate::memory::MemoryDocs;
use async_trait::async_trait;
use loom_core::{FakeClock, SpanEvent, SpanStatus, TraceId};

fn setup() -> TraceStore<MemoryDocs<FakeClock>> {
    TraceStore::new(MemoryDocs::new(FakeClock::new()))
}

fn span(trace_id: TraceId, event_type: &str, ts: u64) -> SpanEvent {
    SpanEvent::new(trace_id, event_type, ts)
}

#[tokio::test]
async fn trace_returns_events_ordered_by_timestamp() {
    let store = setup();
    let trace_id = TraceId::new();
    store.emit(&span(trace_id, "b", 20)).await;
    store.emit(&span(trace_id, "a", 10)).await;
    store.emit(&span(trace_id, "c", 30)).await;

    let events = store.trace(&trace_id).await.unwrap();
    assert_eq!(
        events.iter().map(|e| e.event_type.as_str()).collect::<Vec<_>>(),
        vec!["a", "b", "c"]
    );
}

#[tokio::test]
async fn traces_are_partitioned() {
    let store = setup();
    let one = TraceId::new();
    let two = TraceId::new();
    store.emit(&span(one, "x", 1)).await;
    store.emit(&span(two, "y", 2)).await;

    assert_eq!(store.trace(&one).await.unwrap().len(), 1);
    assert_eq!(store.trace(&two).await.unwrap().len(), 1);
}

#[tokio::test]
async fn events_by_type_filters() {
    let store = setup();
    let trace_id = TraceId::new();
    store.emit(&span(trace_id, "message_received", 1)).await;
    store.emit(&span(trace_id, "message_deduplicated", 2)).await;
    store.emit(&span(trace_id, "message_received", 3)).await;

    let events = store.events_by_type(&trace_id, "message_received").await.unwrap();
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn failures_returns_error_spans_only() {
    let store = setup();
    let trace_id = TraceId::new();
    store.emit(&span(trace_id, "ok_step", 1).with_status(SpanStatus::Ok)).await;
    store.emit(&span(trace_id, "bad_step", 2).with_status(SpanStatus::Error)).await;
    store.emit(&span(trace_id, "untagged", 3)).await;

    let failures = store.failures(&trace_id).await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].event_type, "bad_step");
}

#[tokio::test]
async fn cross_trace_filter_by_time_status_and_type() {
    let store = setup();
    let one = TraceId::new();
    let two = TraceId::new();
    store.emit(&span(one, "step", 10).with_status(SpanStatus::Error)).await;
    store.emit(&span(two, "step", 20).with_status(SpanStatus::Error)).await;
    store.emit(&span(two, "step", 30).with_status(SpanStatus::Ok)).await;
    store.emit(&span(two, "other", 25).with_status(SpanStatus::Error)).await;

    let hits = store
        .query(TraceFilter {
            from_ms: Some(15),
            to_ms: Some(40),
            status: Some(SpanStatus::Error),
            event_type: Some("step".to_string()),
            limit: None,
        })
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].trace_id, two);
    assert_eq!(hits[0].timestamp_ms, 20);
}

/// A document service that always fails, to prove emission swallows errors.
#[derive(Clone)]
struct BrokenDocs;

#[async_trait]
impl DocumentService for BrokenDocs {
    async fn upsert(
        &self,
        _collection: &str,
        _partition_key: &str,
        _id: &str,
        _doc: serde_json::Value,
        _expires_at_ms: Option<u64>,
    ) -> Result<(), StoreError> {
        Err(StoreError::Backend("down".to_string()))
    }

    async fn get(
        &self,
        _collection: &str,
        _partition_key: &str,
        _id: &str,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        Err(StoreError::Backend("down".to_string()))
    }

    async fn query(
        &self,
        _collection: &str,
        _query: DocQuery,
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        Err(StoreError::Backend("down".to_string()))
    }

    async fn delete(
        &self,
        _collection: &str,
        _partition_key: &str,
        _id: &str,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Backend("down".to_string()))
    }
}

#[tokio::test]
async fn emit_swallows_backend_failures() {
    let store = TraceStore::new(BrokenDocs);
    // Must not panic or propagate
    store.emit(&span(TraceId::new(), "anything", 1)).await;
}
