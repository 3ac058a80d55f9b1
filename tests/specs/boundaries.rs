//! Boundary-case specs

use crate::prelude::*;
use loom_core::test_support::invocation_entry;

/// Journal trim where the cursor is at or past the end trims everything.
#[tokio::test]
async fn trim_at_or_past_length_trims_all() {
    let loom = Loom::new();
    let journal = &loom.runtime.stores().journal;
    let actor_id = ActorId::new("t-1");
    for index in 0..3 {
        journal.append_entry(&actor_id, index, &invocation_entry("tick")).await.unwrap();
    }

    assert_eq!(journal.trim_entries(&actor_id, 3).await.unwrap(), 3);
    assert_eq!(journal.entry_count(&actor_id).await.unwrap(), 0);

    // Far past the end on an empty journal is a no-op, not an error.
    assert_eq!(journal.trim_entries(&actor_id, 100).await.unwrap(), 0);
}

/// A lock acquired and then expired: release is a no-op and must not free
/// the successor's lease.
#[tokio::test]
async fn expired_lock_release_is_a_noop() {
    let loom = Loom::new();
    let locks = &loom.runtime.stores().locks;

    let stale = locks.acquire("actor:x", 1_000).await.unwrap().unwrap();
    loom.clock.advance(Duration::from_millis(1_000));
    let fresh = locks.acquire("actor:x", 1_000).await.unwrap().unwrap();

    locks.release(stale).await.unwrap();
    assert!(locks.acquire("actor:x", 1_000).await.unwrap().is_none());
    locks.release(fresh).await.unwrap();
    assert!(locks.acquire("actor:x", 1_000).await.unwrap().is_some());
}

/// A loop whose condition never fires terminates by count; with a timeout
/// declared and an advancing clock it terminates by deadline.
#[tokio::test]
async fn never_terminating_loop_is_bounded() {
    let loom = Loom::new();
    let mut body = IndexMap::new();
    body.insert("body".to_string(), compose(json!(1)));
    let mut action = Action::new(ActionType::Until, Value::Null);
    action.condition = Some(json!("@equals(1,2)"));
    action.actions = body;
    action.limit = Some(LoopLimit { count: 4, timeout: Some("PT1H".to_string()) });

    let def = single_action_workflow("spin", action);
    let run = loom.executor().run("wf", &def, IndexMap::new()).await.unwrap();
    let output = &run.instance.actions["spin"].output;
    assert_eq!(output["status"], json!("max-iterations"));
    assert_eq!(output["iterations"], json!(4));
}

/// Queue stats stay consistent across the lifecycle of a message.
#[tokio::test]
async fn queue_stats_follow_the_lifecycle() {
    let loom = Loom::new();
    let queue_name = QueueName::new("stats");
    loom.enqueue("stats", Message::new("a", "go", json!({}))).await;

    let stats = loom.queue.stats(&queue_name).await.unwrap();
    assert_eq!(stats.queued, 1);

    let delivery = loom.queue.dequeue(&queue_name, Duration::ZERO).await.unwrap().unwrap();
    assert_eq!(loom.queue.stats(&queue_name).await.unwrap().active, 1);

    loom.queue.ack(&queue_name, &delivery.job_id).await.unwrap();
    let stats = loom.queue.stats(&queue_name).await.unwrap();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.queued + stats.active + stats.delayed + stats.failed, 0);
}

/// Multiple consumers replay one progress stream independently.
#[tokio::test]
async fn progress_streams_replay_from_zero() {
    let loom = Loom::new();
    let stream_id = StreamId::new();
    let producer = loom_store::StreamProducer::new(
        loom.streams.clone(),
        loom.clock.clone(),
        stream_id,
    );
    producer.start().await.unwrap();
    producer
        .publish(loom_core::StreamChunk::Progress { current: 1, total: Some(2), message: None })
        .await
        .unwrap();
    producer.complete().await.unwrap();

    for _ in 0..2 {
        let mut consumer = loom_store::StreamConsumer::new(
            loom.streams.clone(),
            loom.clock.clone(),
            stream_id,
        );
        let chunks = consumer.drain().await.unwrap();
        assert_eq!(chunks.len(), 3);
    }
}
