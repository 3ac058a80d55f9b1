// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::memory::MemoryKv;
use loom_core::{FakeClock, SystemClock};
use serde_json::json;

fn queue_name() -> QueueName {
    QueueName::new("actors")
}

fn setup() -> (MessageQueue<MemoryKv, FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    (MessageQueue::new(MemoryKv::new(), clock.clone()), clock)
}

fn message(actor: &str) -> Message {
    Message::new(actor, "process", json!({"n": 1}))
}

#[tokio::test]
async fn enqueue_then_dequeue_delivers_once() {
    let (q, _clock) = setup();
    let job_id = q
        .enqueue(&queue_name(), message("order-1"), EnqueueOptions::default())
        .await
        .unwrap();

    let delivery = q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().unwrap();
    assert_eq!(delivery.job_id, job_id);
    assert_eq!(delivery.attempt, 1);
    assert_eq!(delivery.message.metadata.delivery_attempt, Some(1));

    // Active jobs are not redelivered
    assert!(q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().is_none());
}

#[tokio::test]
async fn dequeue_empty_queue_times_out() {
    let q = MessageQueue::new(MemoryKv::new(), SystemClock);
    let got = q.dequeue(&queue_name(), Duration::from_millis(50)).await.unwrap();
    assert!(got.is_none());
}

#[tokio::test]
async fn higher_priority_dequeues_first() {
    let (q, _clock) = setup();
    let low = q
        .enqueue(&queue_name(), message("low"), EnqueueOptions { priority: 1, ..EnqueueOptions::default() })
        .await
        .unwrap();
    let high = q
        .enqueue(&queue_name(), message("high"), EnqueueOptions { priority: 9, ..EnqueueOptions::default() })
        .await
        .unwrap();

    let first = q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().unwrap();
    let second = q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().unwrap();
    assert_eq!(first.job_id, high);
    assert_eq!(second.job_id, low);
}

#[tokio::test]
async fn fifo_within_one_priority_band() {
    let (q, clock) = setup();
    let a = q.enqueue(&queue_name(), message("a"), EnqueueOptions::default()).await.unwrap();
    clock.advance(Duration::from_millis(1));
    let b = q.enqueue(&queue_name(), message("b"), EnqueueOptions::default()).await.unwrap();

    let first = q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().unwrap();
    let second = q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().unwrap();
    assert_eq!(first.job_id, a);
    assert_eq!(second.job_id, b);
}

#[tokio::test]
async fn delayed_job_invisible_until_due() {
    let (q, clock) = setup();
    q.enqueue(
        &queue_name(),
        message("order-1"),
        EnqueueOptions { delay_ms: 500, ..EnqueueOptions::default() },
    )
    .await
    .unwrap();

    assert!(q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().is_none());
    let stats = q.stats(&queue_name()).await.unwrap();
    assert_eq!(stats.delayed, 1);

    clock.advance(Duration::from_millis(500));
    assert!(q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().is_some());
}

#[tokio::test]
async fn ack_completes_job_and_closes_attempt() {
    let (q, clock) = setup();
    let job_id = q.enqueue(&queue_name(), message("order-1"), EnqueueOptions::default()).await.unwrap();
    q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().unwrap();
    clock.advance(Duration::from_millis(30));
    q.ack(&queue_name(), &job_id).await.unwrap();

    let job = q.job(&queue_name(), &job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    let last = job.attempt_log.last().unwrap();
    assert_eq!(last.status, AttemptStatus::Completed);
    assert_eq!(last.duration_ms, Some(30));
}

#[tokio::test]
async fn nack_requeues_immediately_and_bumps_attempt() {
    let (q, _clock) = setup();
    let job_id = q.enqueue(&queue_name(), message("order-1"), EnqueueOptions::default()).await.unwrap();
    q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().unwrap();
    q.nack(&queue_name(), &job_id, "boom").await.unwrap();

    let redelivery = q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().unwrap();
    assert_eq!(redelivery.attempt, 2);
    let job = q.job(&queue_name(), &job_id).await.unwrap().unwrap();
    assert_eq!(job.attempts, 2);
    assert!(job.attempt_log.iter().any(|a| a.error.as_deref() == Some("boom")));
}

#[tokio::test]
async fn retry_delays_redelivery() {
    let (q, clock) = setup();
    let job_id = q.enqueue(&queue_name(), message("order-1"), EnqueueOptions::default()).await.unwrap();
    q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().unwrap();
    q.retry(&queue_name(), &job_id, Duration::from_millis(1_000), "transient").await.unwrap();

    assert!(q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().is_none());
    clock.advance(Duration::from_millis(1_000));
    let redelivery = q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().unwrap();
    assert_eq!(redelivery.attempt, 2);
}

#[tokio::test]
async fn dead_letter_routes_original_message_with_error() {
    let (q, _clock) = setup();
    let job_id = q.enqueue(&queue_name(), message("order-1"), EnqueueOptions::default()).await.unwrap();
    q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().unwrap();
    q.dead_letter(&queue_name(), &job_id, "exhausted retries").await.unwrap();

    let job = q.job(&queue_name(), &job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.terminal_error.as_deref(), Some("exhausted retries"));

    let dlq = queue_name().dead_letter();
    let dead = q.dequeue(&dlq, Duration::ZERO).await.unwrap().unwrap();
    assert_eq!(dead.job_id, job_id);
    assert_eq!(dead.message.actor_id, "order-1");
    let dead_job = q.job(&dlq, &job_id).await.unwrap().unwrap();
    assert_eq!(dead_job.terminal_error.as_deref(), Some("exhausted retries"));
}

#[tokio::test]
async fn stats_count_each_status() {
    let (q, clock) = setup();
    let done = q.enqueue(&queue_name(), message("a"), EnqueueOptions::default()).await.unwrap();
    q.enqueue(&queue_name(), message("b"), EnqueueOptions::default()).await.unwrap();
    q.enqueue(
        &queue_name(),
        message("c"),
        EnqueueOptions { delay_ms: 10_000, ..EnqueueOptions::default() },
    )
    .await
    .unwrap();

    q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().unwrap();
    q.ack(&queue_name(), &done).await.unwrap();
    clock.advance(Duration::from_millis(1));

    let stats = q.stats(&queue_name()).await.unwrap();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.queued, 1);
    assert_eq!(stats.delayed, 1);
    assert_eq!(stats.active, 0);
    assert_eq!(stats.last_updated_ms, clock.epoch_ms());
}

#[tokio::test]
async fn queue_names_lists_trafficked_queues() {
    let (q, _clock) = setup();
    q.enqueue(&queue_name(), message("a"), EnqueueOptions::default()).await.unwrap();
    q.enqueue(&QueueName::new("other"), message("b"), EnqueueOptions::default()).await.unwrap();

    let names = q.queue_names().await.unwrap();
    assert_eq!(names, vec![QueueName::new("actors"), QueueName::new("other")]);
}

#[tokio::test]
async fn worker_id_is_recorded_on_claims() {
    let clock = FakeClock::new();
    let q = MessageQueue::new(MemoryKv::new(), clock).with_worker_id("w-1");
    let job_id = q.enqueue(&queue_name(), message("a"), EnqueueOptions::default()).await.unwrap();
    q.dequeue(&queue_name(), Duration::ZERO).await.unwrap().unwrap();

    let job = q.job(&queue_name(), &job_id).await.unwrap().unwrap();
    assert_eq!(job.attempt_log[0].worker_id.as_deref(), Some("w-1"));
}
