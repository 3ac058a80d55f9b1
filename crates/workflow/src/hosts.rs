// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host seams the executor dispatches through
//!
//! `Actor`/`AI` actions route to an [`ActorDispatcher`] (the actor runtime),
//! `Activity` actions to an [`ActivityHost`] (e.g. a WASM sandbox), and
//! `@secret(...)` expressions to a [`SecretsResolver`]. Each seam is
//! optional on the executor; a definition touching an unconfigured seam
//! fails that action with a descriptive message.

use async_trait::async_trait;
use loom_core::{ActorId, ActorType, Clock};
use loom_store::{DocumentService, SecretsError, SecretsStore};
use serde_json::Value;

/// Routes an `Actor` (or `AI`) action to an actor and awaits the response.
#[async_trait]
pub trait ActorDispatcher: Send + Sync {
    /// `actor_id = None` routes to the least-loaded instance of the type.
    async fn dispatch(
        &self,
        actor_type: &ActorType,
        actor_id: Option<&ActorId>,
        method: &str,
        args: Value,
    ) -> Result<Value, String>;
}

/// Runs a registered activity outside the runtime (e.g. in a WASM sandbox).
#[async_trait]
pub trait ActivityHost: Send + Sync {
    async fn run(&self, name: &str, input: Value) -> Result<Value, String>;
}

/// Resolves `@secret('name')` references.
#[async_trait]
pub trait SecretsResolver: Send + Sync {
    /// Errors use the exact wording surfaced to workflow authors:
    /// `"Secret not found: <name>"`.
    async fn resolve(&self, name: &str) -> Result<String, String>;
}

#[async_trait]
impl<D, C> SecretsResolver for SecretsStore<D, C>
where
    D: DocumentService,
    C: Clock,
{
    async fn resolve(&self, name: &str) -> Result<String, String> {
        match self.get_secret(name, None).await {
            Ok(version) => Ok(version.value),
            Err(SecretsError::NotFound(name)) => Err(format!("Secret not found: {name}")),
            Err(e) => Err(e.to_string()),
        }
    }
}
