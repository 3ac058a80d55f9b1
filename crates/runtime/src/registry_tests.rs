// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use loom_actor::{ActorCell, ActorError};
use loom_core::ActorConfig;
use serde_json::{json, Value};

struct EchoActor;

impl Actor for EchoActor {
    fn execute(&self, _cell: &mut ActorCell, input: Option<&Value>) -> Result<Value, ActorError> {
        Ok(input.cloned().unwrap_or(Value::Null))
    }
}

#[test]
fn register_then_build() {
    let registry = ActorRegistry::new();
    registry.register("EchoActor", ActorConfig::default(), |_context| Arc::new(EchoActor));

    let echo = ActorType::new("EchoActor");
    assert!(registry.contains(&echo));
    let context = ActorContext::new("echo-1", "EchoActor");
    let actor = registry.build(&echo, &context).unwrap();
    let mut cell = ActorCell::new(context, ActorConfig::default());
    assert_eq!(actor.execute(&mut cell, Some(&json!(7))).unwrap(), json!(7));
}

#[test]
fn unknown_type_is_absent() {
    let registry = ActorRegistry::new();
    let ghost = ActorType::new("Ghost");
    assert!(!registry.contains(&ghost));
    assert!(registry.config_of(&ghost).is_none());
    assert!(registry.build(&ghost, &ActorContext::new("g", "Ghost")).is_none());
}

#[test]
fn config_is_per_type() {
    let registry = ActorRegistry::new();
    registry.register(
        "Slow",
        ActorConfig { timeout_ms: 90_000, ..ActorConfig::default() },
        |_| Arc::new(EchoActor),
    );
    registry.register("Fast", ActorConfig::default(), |_| Arc::new(EchoActor));

    assert_eq!(registry.config_of(&ActorType::new("Slow")).unwrap().timeout_ms, 90_000);
    assert_eq!(registry.config_of(&ActorType::new("Fast")).unwrap().timeout_ms, 30_000);
}

#[test]
fn type_names_are_sorted() {
    let registry = ActorRegistry::new();
    registry.register("Zeta", ActorConfig::default(), |_| Arc::new(EchoActor));
    registry.register("Alpha", ActorConfig::default(), |_| Arc::new(EchoActor));
    assert_eq!(
        registry.type_names(),
        vec![ActorType::new("Alpha"), ActorType::new("Zeta")]
    );
}
