//! Durable actor execution specs
//!
//! Suspension on activity calls, resume via queue messages, replay
//! equivalence and crash recovery.

use crate::prelude::*;

/// Calls the "sum" activity once and stores the result.
struct SumActor;

impl Actor for SumActor {
    fn execute(&self, cell: &mut ActorCell, _input: Option<&Value>) -> Result<Value, ActorError> {
        if let Some(sum) = cell.get("sum") {
            return Ok(sum.clone());
        }
        let result = cell.call_activity("sum", json!({"a": 3, "b": 4}))?;
        cell.update_state(|s| {
            s.insert("sum".to_string(), result.clone());
        })?;
        Ok(result)
    }
}

/// Applies the activity result directly, without ever suspending.
struct DirectSumActor;

impl Actor for DirectSumActor {
    fn execute(&self, cell: &mut ActorCell, _input: Option<&Value>) -> Result<Value, ActorError> {
        cell.update_state(|s| {
            s.insert("sum".to_string(), json!(7));
        })?;
        Ok(json!(7))
    }
}

fn setup() -> Loom {
    let loom = Loom::new();
    loom.register("SumActor", ActorConfig::default(), || SumActor);
    loom.register("DirectSumActor", ActorConfig::default(), || DirectSumActor);
    loom
}

/// Actor replay after an activity: suspend, deliver the result as a queue
/// message, and end with the same state a non-suspended run returning 7
/// would produce.
#[tokio::test]
async fn resumed_run_matches_a_hypothetical_direct_run() {
    let loom = setup();

    loom.enqueue("sums", Message::new("s-1", "start", json!({}))).await;
    assert!(loom.pump("sums", "SumActor").await);
    assert_eq!(loom.metrics.counter("worker.messages_suspended"), 1);

    // The activity result is delivered as a message.
    loom.enqueue(
        "sums",
        Message::new("s-1", "activity:completed", json!({"activityId": "act-1", "result": 7})),
    )
    .await;
    assert!(loom.pump("sums", "SumActor").await);

    let resumed_state = loom
        .runtime
        .stores()
        .state
        .load_state(&ActorId::new("s-1"))
        .await
        .unwrap()
        .unwrap();

    // Hypothetical non-suspended run with the same result.
    loom.enqueue("sums", Message::new("direct-1", "start", json!({}))).await;
    assert!(loom.pump("sums", "DirectSumActor").await);
    let direct_state = loom
        .runtime
        .stores()
        .state
        .load_state(&ActorId::new("direct-1"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(resumed_state, direct_state);
    assert_eq!(resumed_state.get("sum"), Some(&json!(7)));
}

/// A failed activity rethrows at the call site and follows the retry/DLQ
/// path.
#[tokio::test]
async fn failed_activity_dead_letters_after_retries() {
    let loom = Loom::new();
    loom.register(
        "SumActor",
        ActorConfig {
            retry_policy: RetryPolicy { max_attempts: 1, ..RetryPolicy::default() },
            ..ActorConfig::default()
        },
        || SumActor,
    );

    loom.enqueue("sums", Message::new("s-1", "start", json!({}))).await;
    loom.pump("sums", "SumActor").await;
    loom.enqueue(
        "sums",
        Message::new(
            "s-1",
            "activity:failed",
            json!({"activityId": "act-1", "error": "sandbox crashed"}),
        ),
    )
    .await;
    loom.pump("sums", "SumActor").await;

    // max_attempts = 1: the failure is terminal and lands on the DLQ.
    let dead = loom
        .queue
        .dequeue(&QueueName::new("sums.dlq"), Duration::ZERO)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(dead.message.actor_id, ActorId::new("s-1"));
}

/// Eviction/crash between messages loses nothing: the journal rebuilds
/// bit-identical state.
#[tokio::test]
async fn rehydration_reproduces_state_exactly() {
    struct LedgerActor;
    impl Actor for LedgerActor {
        fn execute(&self, cell: &mut ActorCell, input: Option<&Value>) -> Result<Value, ActorError> {
            let amount = input.and_then(|v| v.get("amount")).and_then(Value::as_i64).unwrap_or(0);
            cell.update_state(|s| {
                let total = s.get("total").and_then(Value::as_i64).unwrap_or(0);
                s.insert("total".to_string(), json!(total + amount));
                let n = s.get("entries").and_then(Value::as_i64).unwrap_or(0);
                s.insert("entries".to_string(), json!(n + 1));
            })?;
            Ok(cell.state().get("total").cloned().unwrap_or(Value::Null))
        }
    }

    let loom = Loom::new();
    loom.register("LedgerActor", ActorConfig::default(), || LedgerActor);
    for amount in [10, 20, 30] {
        loom.enqueue("ledger", Message::new("l-1", "credit", json!({"amount": amount}))).await;
        loom.pump("ledger", "LedgerActor").await;
    }
    let live = loom
        .runtime
        .stores()
        .state
        .load_state(&ActorId::new("l-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(live.get("total"), Some(&json!(60)));

    // Fresh runtime over the same storage: replay alone rebuilds the state.
    let recovered = Loom {
        runtime: {
            let registry = Arc::new(ActorRegistry::new());
            registry.register("LedgerActor", ActorConfig::default(), |_| Arc::new(LedgerActor));
            Arc::new(ActorRuntime::new(
                registry,
                RuntimeStores {
                    journal: JournalStore::new(loom.streams.clone(), loom.kv.clone()),
                    state: StateStore::new(loom.kv.clone()),
                    locks: LockManager::new(loom.kv.clone(), loom.clock.clone()),
                    traces: TraceStore::new(loom.docs.clone()),
                    streams: loom.streams.clone(),
                },
                loom.clock.clone(),
            ))
        },
        clock: loom.clock.clone(),
        streams: loom.streams.clone(),
        kv: loom.kv.clone(),
        docs: loom.docs.clone(),
        queue: loom.queue.clone(),
        idempotency: loom.idempotency.clone(),
        metrics: Arc::new(MetricsCollector::new()),
    };

    recovered
        .enqueue("ledger", Message::new("l-1", "credit", json!({"amount": 5})))
        .await;
    recovered.pump("ledger", "LedgerActor").await;
    let after = recovered
        .runtime
        .stores()
        .state
        .load_state(&ActorId::new("l-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.get("total"), Some(&json!(65)));
    assert_eq!(after.get("entries"), Some(&json!(4)));
}

/// Compaction snapshots, trims, and preserves the fold invariant:
/// state at cursor == replay of journal[..cursor] from default state.
#[tokio::test]
async fn compaction_preserves_the_fold() {
    struct TickActor;
    impl Actor for TickActor {
        fn execute(&self, cell: &mut ActorCell, _input: Option<&Value>) -> Result<Value, ActorError> {
            cell.update_state(|s| {
                let n = s.get("ticks").and_then(Value::as_i64).unwrap_or(0);
                s.insert("ticks".to_string(), json!(n + 1));
            })?;
            Ok(Value::Null)
        }
    }

    let loom = Loom::new();
    loom.register(
        "TickActor",
        ActorConfig { journal_compaction_threshold: 6, ..ActorConfig::default() },
        || TickActor,
    );

    for _ in 0..5 {
        loom.enqueue("ticks", Message::new("t-1", "tick", json!({}))).await;
        loom.pump("ticks", "TickActor").await;
    }

    let journal = &loom.runtime.stores().journal;
    let actor_id = ActorId::new("t-1");
    let snapshot = journal.latest_snapshot(&actor_id).await.unwrap().unwrap();
    assert_eq!(snapshot.state.get("ticks"), Some(&json!(3)));
    assert_eq!(snapshot.cursor, 6);

    // Retained entries all sit past the snapshot cursor.
    for record in journal.read_entries(&actor_id).await.unwrap() {
        assert!(record.index >= snapshot.cursor);
    }

    // And the live state equals snapshot + retained patches.
    let live = loom
        .runtime
        .stores()
        .state
        .load_state(&actor_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(live.get("ticks"), Some(&json!(5)));
}

/// update_state followed by compensation restores the prior state exactly.
#[tokio::test]
async fn compensation_round_trips_state() {
    struct CompensatingActor;
    impl Actor for CompensatingActor {
        fn execute(&self, cell: &mut ActorCell, _input: Option<&Value>) -> Result<Value, ActorError> {
            cell.update_state(|s| {
                s.insert("base".to_string(), json!({"nested": [1, 2, 3]}));
            })?;
            let before = serde_json::to_value(cell.state()).unwrap_or(Value::Null);
            cell.update_state(|s| {
                s.insert("base".to_string(), json!("overwritten"));
                s.insert("extra".to_string(), json!(true));
            })?;
            cell.compensate_last_state_change()?;
            let after = serde_json::to_value(cell.state()).unwrap_or(Value::Null);
            Ok(json!({"matches": before == after}))
        }
    }

    let loom = Loom::new();
    loom.register("CompensatingActor", ActorConfig::default(), || CompensatingActor);
    loom.enqueue("comp", Message::new("c-1", "go", json!({}))).await;
    loom.pump("comp", "CompensatingActor").await;

    let record = loom
        .queue
        .job(&QueueName::new("comp"), &{
            let jobs = loom.queue.jobs(&QueueName::new("comp")).await.unwrap();
            jobs[0].job_id.clone()
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, JobStatus::Completed);

    let state = loom
        .runtime
        .stores()
        .state
        .load_state(&ActorId::new("c-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.get("base"), Some(&json!({"nested": [1, 2, 3]})));
    assert!(!state.contains_key("extra"));
}
