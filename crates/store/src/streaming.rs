// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress/token streaming over stream topics
//!
//! A producer appends chunks to a topic keyed by stream id; any number of
//! consumers iterate the topic lazily and independently, each replaying from
//! "0". The terminal chunk puts a TTL on the topic so finished streams age
//! out.

use crate::capability::{StreamBound, StreamEntryId, StreamService};
use crate::error::StoreError;
use loom_core::{Clock, StreamChunk, StreamId};
use std::time::Duration;

/// How long a finished topic stays readable.
const TERMINAL_TTL: Duration = Duration::from_secs(60);

/// How often a blocked consumer re-checks the topic.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

fn topic_key(stream_id: &StreamId) -> String {
    format!("stream:{stream_id}")
}

/// Chunk producer for one stream topic.
#[derive(Clone)]
pub struct StreamProducer<S, C> {
    streams: S,
    clock: C,
    stream_id: StreamId,
}

impl<S, C> StreamProducer<S, C>
where
    S: StreamService,
    C: Clock,
{
    pub fn new(streams: S, clock: C, stream_id: StreamId) -> Self {
        Self { streams, clock, stream_id }
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    pub async fn publish(&self, chunk: StreamChunk) -> Result<(), StoreError> {
        let terminal = chunk.is_terminal();
        let payload = serde_json::to_value(&chunk)?;
        self.streams.xadd(&topic_key(&self.stream_id), payload).await?;
        if terminal {
            let at = self.clock.epoch_ms() + TERMINAL_TTL.as_millis() as u64;
            self.streams.expire_at(&topic_key(&self.stream_id), at).await?;
        }
        Ok(())
    }

    pub async fn start(&self) -> Result<(), StoreError> {
        self.publish(StreamChunk::Start { timestamp_ms: self.clock.epoch_ms() }).await
    }

    pub async fn complete(&self) -> Result<(), StoreError> {
        self.publish(StreamChunk::Complete { timestamp_ms: self.clock.epoch_ms() }).await
    }

    pub async fn error(&self, error: impl Into<String>) -> Result<(), StoreError> {
        self.publish(StreamChunk::Error { error: error.into() }).await
    }
}

/// Lazy chunk consumer for one stream topic.
///
/// Each consumer tracks its own position starting at "0", so multiple
/// consumers read the same stream independently and a restarted consumer
/// replays from the beginning.
pub struct StreamConsumer<S, C> {
    streams: S,
    clock: C,
    stream_id: StreamId,
    position: StreamEntryId,
    finished: bool,
}

impl<S, C> StreamConsumer<S, C>
where
    S: StreamService,
    C: Clock,
{
    pub fn new(streams: S, clock: C, stream_id: StreamId) -> Self {
        Self { streams, clock, stream_id, position: StreamEntryId::ZERO, finished: false }
    }

    /// Next chunk, blocking up to `timeout`. Returns `None` once a terminal
    /// chunk has been consumed, or when the timeout elapses with no chunk.
    pub async fn next(&mut self, timeout: Duration) -> Result<Option<StreamChunk>, StoreError> {
        if self.finished {
            return Ok(None);
        }
        let deadline = self.clock.now() + timeout;
        loop {
            let entries = self
                .streams
                .xrange(
                    &topic_key(&self.stream_id),
                    StreamBound::After(self.position),
                    StreamBound::Max,
                )
                .await?;
            if let Some(entry) = entries.into_iter().next() {
                self.position = entry.id;
                let chunk: StreamChunk = serde_json::from_value(entry.payload)?;
                if chunk.is_terminal() {
                    self.finished = true;
                }
                return Ok(Some(chunk));
            }
            if self.clock.now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Drain everything currently available up to and including the terminal
    /// chunk, without blocking.
    pub async fn drain(&mut self) -> Result<Vec<StreamChunk>, StoreError> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.next(Duration::ZERO).await? {
            chunks.push(chunk);
        }
        Ok(chunks)
    }
}

#[cfg(test)]
#[path = "streaming_tests.rs"]
mod tests;
