// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-level state diffing and patch application

use indexmap::IndexMap;
use loom_core::StatePatch;
use serde_json::Value;

/// Compute forward+inverse patches turning `before` into `after`.
///
/// Patch order: removals and changes in `before` iteration order, then
/// insertions in `after` iteration order.
pub fn diff_states(
    before: &IndexMap<String, Value>,
    after: &IndexMap<String, Value>,
) -> Vec<StatePatch> {
    let mut patches = Vec::new();
    for (key, prev) in before {
        match after.get(key) {
            None => patches.push(StatePatch {
                key: key.clone(),
                value: None,
                prev: Some(prev.clone()),
            }),
            Some(next) if next != prev => patches.push(StatePatch {
                key: key.clone(),
                value: Some(next.clone()),
                prev: Some(prev.clone()),
            }),
            Some(_) => {}
        }
    }
    for (key, next) in after {
        if !before.contains_key(key) {
            patches.push(StatePatch {
                key: key.clone(),
                value: Some(next.clone()),
                prev: None,
            });
        }
    }
    patches
}

/// Apply one forward patch in place.
pub fn apply_patch(state: &mut IndexMap<String, Value>, patch: &StatePatch) {
    match &patch.value {
        Some(value) => {
            state.insert(patch.key.clone(), value.clone());
        }
        None => {
            state.shift_remove(&patch.key);
        }
    }
}

pub fn apply_patches(state: &mut IndexMap<String, Value>, patches: &[StatePatch]) {
    for patch in patches {
        apply_patch(state, patch);
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
