// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded instance pool with tiered LRU eviction

use loom_actor::ActorInstance;
use loom_core::{ActorId, EvictionPriority};
use std::collections::HashMap;

struct PoolEntry<S, K, C> {
    instance: ActorInstance<S, K, C>,
    priority: EvictionPriority,
    last_used: u64,
}

/// Keeps activated instances warm between invocations.
///
/// Instances are checked out for dispatch (the per-actor lock guarantees a
/// single borrower) and checked back in afterwards. On pressure, the entry
/// with the lowest `(priority, last_used)` goes first: `low` before
/// `medium` before `high`, LRU within a tier. Eviction is safe at any time:
/// a suspended or idle instance rehydrates from snapshot + journal.
pub struct InstancePool<S, K, C> {
    capacity: usize,
    entries: HashMap<ActorId, PoolEntry<S, K, C>>,
    tick: u64,
}

impl<S, K, C> InstancePool<S, K, C> {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), entries: HashMap::new(), tick: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, actor_id: &ActorId) -> bool {
        self.entries.contains_key(actor_id)
    }

    /// Check an instance out for dispatch.
    pub fn check_out(&mut self, actor_id: &ActorId) -> Option<ActorInstance<S, K, C>> {
        self.entries.remove(actor_id).map(|entry| entry.instance)
    }

    /// Return (or first-insert) an instance, then evict down to capacity.
    /// Returns the ids evicted to make room.
    pub fn check_in(
        &mut self,
        actor_id: ActorId,
        instance: ActorInstance<S, K, C>,
        priority: EvictionPriority,
    ) -> Vec<ActorId> {
        self.tick += 1;
        self.entries.insert(
            actor_id,
            PoolEntry { instance, priority, last_used: self.tick },
        );
        self.evict_to_capacity()
    }

    pub fn remove(&mut self, actor_id: &ActorId) -> bool {
        self.entries.remove(actor_id).is_some()
    }

    fn evict_to_capacity(&mut self) -> Vec<ActorId> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            let victim = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| (entry.priority, entry.last_used))
                .map(|(id, _)| id.clone());
            let Some(victim) = victim else {
                break;
            };
            tracing::debug!(actor_id = %victim, "evicting instance");
            self.entries.remove(&victim);
            evicted.push(victim);
        }
        evicted
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
