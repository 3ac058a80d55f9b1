// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of actor types

use loom_actor::Actor;
use loom_core::{ActorConfig, ActorContext, ActorType};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

type Factory = Arc<dyn Fn(&ActorContext) -> Arc<dyn Actor> + Send + Sync>;

struct Registration {
    config: ActorConfig,
    factory: Factory,
}

/// Maps actor type names to their infrastructure policy and factory.
#[derive(Default)]
pub struct ActorRegistry {
    types: RwLock<HashMap<ActorType, Registration>>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, actor_type: impl Into<ActorType>, config: ActorConfig, factory: F)
    where
        F: Fn(&ActorContext) -> Arc<dyn Actor> + Send + Sync + 'static,
    {
        let actor_type = actor_type.into();
        tracing::debug!(actor_type = %actor_type, "actor type registered");
        self.types
            .write()
            .insert(actor_type, Registration { config, factory: Arc::new(factory) });
    }

    pub fn config_of(&self, actor_type: &ActorType) -> Option<ActorConfig> {
        self.types.read().get(actor_type).map(|r| r.config.clone())
    }

    pub fn build(&self, actor_type: &ActorType, context: &ActorContext) -> Option<Arc<dyn Actor>> {
        let types = self.types.read();
        let registration = types.get(actor_type)?;
        Some((registration.factory)(context))
    }

    pub fn contains(&self, actor_type: &ActorType) -> bool {
        self.types.read().contains_key(actor_type)
    }

    pub fn type_names(&self) -> Vec<ActorType> {
        let mut names: Vec<ActorType> = self.types.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
