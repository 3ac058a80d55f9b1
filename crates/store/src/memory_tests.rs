// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use loom_core::FakeClock;
use serde_json::json;
use std::time::Duration;

fn streams() -> (MemoryStreams<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    (MemoryStreams::new(clock.clone()), clock)
}

#[tokio::test]
async fn xadd_assigns_monotonic_ids() {
    let (streams, clock) = streams();
    let a = streams.xadd("s", json!(1)).await.unwrap();
    let b = streams.xadd("s", json!(2)).await.unwrap();
    clock.advance(Duration::from_millis(5));
    let c = streams.xadd("s", json!(3)).await.unwrap();
    assert!(a < b && b < c);
    assert_eq!(a.ms, b.ms);
    assert_eq!(b.seq, a.seq + 1);
    assert_eq!(c.seq, 0);
}

#[tokio::test]
async fn xrange_filters_and_orders() {
    let (streams, _clock) = streams();
    let a = streams.xadd("s", json!(1)).await.unwrap();
    let b = streams.xadd("s", json!(2)).await.unwrap();
    let c = streams.xadd("s", json!(3)).await.unwrap();

    let all = streams.xrange("s", StreamBound::Min, StreamBound::Max).await.unwrap();
    assert_eq!(all.iter().map(|e| e.id).collect::<Vec<_>>(), vec![a, b, c]);

    let after_a = streams
        .xrange("s", StreamBound::After(a), StreamBound::Max)
        .await
        .unwrap();
    assert_eq!(after_a.iter().map(|e| e.id).collect::<Vec<_>>(), vec![b, c]);

    let rev = streams.xrevrange("s", StreamBound::Min, StreamBound::Max).await.unwrap();
    assert_eq!(rev.first().map(|e| e.id), Some(c));
}

#[tokio::test]
async fn xtrim_drops_below_min_id() {
    let (streams, _clock) = streams();
    streams.xadd("s", json!(1)).await.unwrap();
    let b = streams.xadd("s", json!(2)).await.unwrap();
    streams.xadd("s", json!(3)).await.unwrap();

    let dropped = streams.xtrim("s", b).await.unwrap();
    assert_eq!(dropped, 1);
    assert_eq!(streams.xlen("s").await.unwrap(), 2);
    let info = streams.xinfo("s").await.unwrap().unwrap();
    assert_eq!(info.first_id, Some(b));
}

#[tokio::test]
async fn expired_stream_is_dropped_on_touch() {
    let (streams, clock) = streams();
    streams.xadd("s", json!(1)).await.unwrap();
    streams.expire_at("s", clock.epoch_ms() + 100).await.unwrap();

    clock.advance(Duration::from_millis(99));
    assert_eq!(streams.xlen("s").await.unwrap(), 1);

    clock.advance(Duration::from_millis(1));
    assert_eq!(streams.xlen("s").await.unwrap(), 0);
}

#[tokio::test]
async fn kv_strings_and_scan() {
    let kv = MemoryKv::new();
    kv.set("a:1", json!(1)).await.unwrap();
    kv.set("a:2", json!(2)).await.unwrap();
    kv.set("b:1", json!(3)).await.unwrap();

    assert_eq!(kv.get("a:1").await.unwrap(), Some(json!(1)));
    assert_eq!(kv.keys("a:").await.unwrap(), vec!["a:1", "a:2"]);
    assert!(kv.del("a:1").await.unwrap());
    assert_eq!(kv.get("a:1").await.unwrap(), None);
}

#[tokio::test]
async fn kv_list_push_pop_range() {
    let kv = MemoryKv::new();
    kv.lpush("l", json!("b")).await.unwrap();
    kv.lpush("l", json!("a")).await.unwrap();
    assert_eq!(kv.lrange("l", 0, -1).await.unwrap(), vec![json!("a"), json!("b")]);
    assert_eq!(kv.lpop("l").await.unwrap(), Some(json!("a")));
    assert_eq!(kv.lpop("l").await.unwrap(), Some(json!("b")));
    assert_eq!(kv.lpop("l").await.unwrap(), None);
}

#[tokio::test]
async fn kv_hash_ops() {
    let kv = MemoryKv::new();
    kv.hset("h", "name", json!("x")).await.unwrap();
    assert_eq!(kv.hincrby("h", "count", 2).await.unwrap(), 2);
    assert_eq!(kv.hincrby("h", "count", 3).await.unwrap(), 5);
    assert_eq!(kv.hget("h", "name").await.unwrap(), Some(json!("x")));
    let all = kv.hgetall("h").await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn kv_set_ops() {
    let kv = MemoryKv::new();
    assert!(kv.sadd("s", "a").await.unwrap());
    assert!(!kv.sadd("s", "a").await.unwrap());
    kv.sadd("s", "b").await.unwrap();
    let mut members = kv.smembers("s").await.unwrap();
    members.sort();
    assert_eq!(members, vec!["a", "b"]);
    assert!(kv.srem("s", "a").await.unwrap());
    assert!(!kv.srem("s", "a").await.unwrap());
}

#[tokio::test]
async fn docs_partition_query_and_ttl() {
    let clock = FakeClock::new();
    let docs = MemoryDocs::new(clock.clone());
    docs.upsert("t", "p1", "a", json!({"timestamp_ms": 10, "status": "ok"}), None)
        .await
        .unwrap();
    docs.upsert("t", "p1", "b", json!({"timestamp_ms": 20, "status": "error"}), None)
        .await
        .unwrap();
    docs.upsert("t", "p2", "c", json!({"timestamp_ms": 30, "status": "error"}), None)
        .await
        .unwrap();

    let p1 = docs
        .query("t", DocQuery::partition("p1").ordered_by("timestamp_ms"))
        .await
        .unwrap();
    assert_eq!(p1.len(), 2);
    assert_eq!(p1[0]["timestamp_ms"], 10);

    let errors = docs
        .query("t", DocQuery::default().field_eq("status", json!("error")))
        .await
        .unwrap();
    assert_eq!(errors.len(), 2);

    let ranged = docs
        .query(
            "t",
            DocQuery::default().field_range("timestamp_ms", Some(15), Some(25)),
        )
        .await
        .unwrap();
    assert_eq!(ranged.len(), 1);

    // TTL hides the doc once the clock passes it
    docs.upsert("t", "p1", "d", json!({"timestamp_ms": 40}), Some(clock.epoch_ms() + 50))
        .await
        .unwrap();
    assert!(docs.get("t", "p1", "d").await.unwrap().is_some());
    clock.advance(Duration::from_millis(50));
    assert!(docs.get("t", "p1", "d").await.unwrap().is_none());
}

#[tokio::test]
async fn docs_upsert_replaces_and_delete_removes() {
    let clock = FakeClock::new();
    let docs = MemoryDocs::new(clock);
    docs.upsert("t", "p", "a", json!({"v": 1}), None).await.unwrap();
    docs.upsert("t", "p", "a", json!({"v": 2}), None).await.unwrap();
    assert_eq!(docs.get("t", "p", "a").await.unwrap(), Some(json!({"v": 2})));
    assert!(docs.delete("t", "p", "a").await.unwrap());
    assert!(!docs.delete("t", "p", "a").await.unwrap());
}
