// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Span event writer and reader over the document capability
//!
//! Emission never surfaces an error to the instrumented code path: a trace
//! store outage must not fail an actor invocation.

use crate::capability::{DocQuery, DocumentService};
use crate::error::StoreError;
use loom_core::{SpanEvent, SpanStatus, TraceId};
use serde_json::{json, Value};

const COLLECTION: &str = "trace_events";

/// Cross-trace filter for admin queries.
#[derive(Debug, Clone, Default)]
pub struct TraceFilter {
    pub from_ms: Option<u64>,
    pub to_ms: Option<u64>,
    pub status: Option<SpanStatus>,
    pub event_type: Option<String>,
    pub limit: Option<usize>,
}

/// Trace store partitioned by `trace_id`.
#[derive(Clone)]
pub struct TraceStore<D> {
    docs: D,
}

impl<D: DocumentService> TraceStore<D> {
    pub fn new(docs: D) -> Self {
        Self { docs }
    }

    /// Emit one span event. Failures are swallowed with a warning; tracing
    /// must never throw into user code.
    pub async fn emit(&self, span: &SpanEvent) {
        let doc = match serde_json::to_value(span) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(error = %e, event_type = span.event_type, "span does not encode, dropping");
                return;
            }
        };
        if let Err(e) = self
            .docs
            .upsert(
                COLLECTION,
                span.trace_id.as_str(),
                span.span_id.as_str(),
                doc,
                None,
            )
            .await
        {
            tracing::warn!(error = %e, trace_id = %span.trace_id, "span emission failed, dropping");
        }
    }

    /// All events of one trace, ordered by timestamp.
    pub async fn trace(&self, trace_id: &TraceId) -> Result<Vec<SpanEvent>, StoreError> {
        let docs = self
            .docs
            .query(
                COLLECTION,
                DocQuery::partition(trace_id.as_str()).ordered_by("timestamp_ms"),
            )
            .await?;
        parse_spans(docs)
    }

    pub async fn events_by_type(
        &self,
        trace_id: &TraceId,
        event_type: &str,
    ) -> Result<Vec<SpanEvent>, StoreError> {
        let docs = self
            .docs
            .query(
                COLLECTION,
                DocQuery::partition(trace_id.as_str())
                    .field_eq("event_type", json!(event_type))
                    .ordered_by("timestamp_ms"),
            )
            .await?;
        parse_spans(docs)
    }

    pub async fn failures(&self, trace_id: &TraceId) -> Result<Vec<SpanEvent>, StoreError> {
        let docs = self
            .docs
            .query(
                COLLECTION,
                DocQuery::partition(trace_id.as_str())
                    .field_eq("status", json!("error"))
                    .ordered_by("timestamp_ms"),
            )
            .await?;
        parse_spans(docs)
    }

    /// Cross-trace filter by time range, status and event type.
    pub async fn query(&self, filter: TraceFilter) -> Result<Vec<SpanEvent>, StoreError> {
        let mut query = DocQuery::default().ordered_by("timestamp_ms");
        if filter.from_ms.is_some() || filter.to_ms.is_some() {
            query = query.field_range("timestamp_ms", filter.from_ms, filter.to_ms);
        }
        if let Some(status) = filter.status {
            query = query.field_eq("status", serde_json::to_value(status)?);
        }
        if let Some(event_type) = filter.event_type {
            query = query.field_eq("event_type", json!(event_type));
        }
        if let Some(limit) = filter.limit {
            query = query.with_limit(limit);
        }
        let docs = self.docs.query(COLLECTION, query).await?;
        parse_spans(docs)
    }
}

fn parse_spans(docs: Vec<Value>) -> Result<Vec<SpanEvent>, StoreError> {
    let mut spans = Vec::with_capacity(docs.len());
    for doc in docs {
        spans.push(serde_json::from_value(doc)?);
    }
    Ok(spans)
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
