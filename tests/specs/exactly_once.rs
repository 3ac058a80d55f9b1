//! Exactly-once processing specs

use crate::prelude::*;
use parking_lot::Mutex;

/// Counts how many times execute actually ran.
struct CountingActor {
    executions: Arc<Mutex<u32>>,
}

impl Actor for CountingActor {
    fn execute(&self, cell: &mut ActorCell, _input: Option<&Value>) -> Result<Value, ActorError> {
        *self.executions.lock() += 1;
        cell.update_state(|s| {
            let n = s.get("count").and_then(Value::as_i64).unwrap_or(0);
            s.insert("count".to_string(), json!(n + 1));
        })?;
        Ok(cell.state().get("count").cloned().unwrap_or(Value::Null))
    }
}

fn setup() -> (Loom, Arc<Mutex<u32>>) {
    let loom = Loom::new();
    let executions = Arc::new(Mutex::new(0));
    let counter = executions.clone();
    loom.runtime
        .registry()
        .register("CountingActor", ActorConfig::default(), move |_| {
            Arc::new(CountingActor { executions: counter.clone() })
        });
    (loom, executions)
}

/// Exactly-once under redelivery: the first delivery completed and stored
/// its result; the second delivery with the same idempotency key observes
/// the cache, emits `message_deduplicated`, and never re-invokes execute.
#[tokio::test]
async fn redelivery_with_same_key_executes_once() {
    let (loom, executions) = setup();
    let trace_id = TraceId::new();
    let message = |id: &str| {
        let mut m = Message::new("k-1", "go", json!({}))
            .with_correlation(trace_id.as_str())
            .with_idempotency_key("K");
        m.message_id = loom_core::MessageId::from_string(id);
        m
    };

    // First delivery: executes and stores the idempotency record.
    loom.enqueue("counting", message("msg-first")).await;
    loom.pump("counting", "CountingActor").await;
    assert_eq!(*executions.lock(), 1);

    // Redelivery (the ack was lost upstream): cached result, no second run.
    loom.enqueue("counting", message("msg-second")).await;
    loom.pump("counting", "CountingActor").await;
    assert_eq!(*executions.lock(), 1);

    let record = loom.idempotency.get("K").await.unwrap().unwrap();
    assert_eq!(record.result, json!(1));
    assert_eq!(record.actor_id, ActorId::new("k-1"));

    let dedup = loom
        .runtime
        .stores()
        .traces
        .events_by_type(&trace_id, "message_deduplicated")
        .await
        .unwrap();
    assert_eq!(dedup.len(), 1);
}

/// Distinct keys are independent executions.
#[tokio::test]
async fn distinct_keys_execute_separately() {
    let (loom, executions) = setup();
    for key in ["K1", "K2"] {
        loom.enqueue(
            "counting",
            Message::new("k-1", "go", json!({})).with_idempotency_key(key),
        )
        .await;
        loom.pump("counting", "CountingActor").await;
    }
    assert_eq!(*executions.lock(), 2);
}

/// Within the TTL the number of executions attributable to one key is
/// exactly one, no matter how many deliveries arrive.
#[tokio::test]
async fn many_redeliveries_one_execution() {
    let (loom, executions) = setup();
    for _ in 0..5 {
        loom.enqueue(
            "counting",
            Message::new("k-1", "go", json!({})).with_idempotency_key("K"),
        )
        .await;
        loom.pump("counting", "CountingActor").await;
    }
    assert_eq!(*executions.lock(), 1);
}

/// Messages without a key are not deduplicated.
#[tokio::test]
async fn keyless_messages_always_execute() {
    let (loom, executions) = setup();
    for _ in 0..3 {
        loom.enqueue("counting", Message::new("k-1", "go", json!({}))).await;
        loom.pump("counting", "CountingActor").await;
    }
    assert_eq!(*executions.lock(), 3);
}
