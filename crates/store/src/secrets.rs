// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned secrets store

use crate::capability::{DocQuery, DocumentService};
use crate::error::{SecretsError, StoreError};
use loom_core::{Clock, SecretAttributes, SecretProperties, SecretVersion};
use serde_json::{json, Value};
use std::collections::HashMap;

const COLLECTION: &str = "secrets";
const META_ID: &str = "__meta";

/// Secrets store over the document capability, partitioned by secret name.
///
/// Versions are named "v1", "v2", … with monotonic creation timestamps. The
/// meta document per name carries the version counter so numbering survives
/// garbage collection of expired versions.
#[derive(Clone)]
pub struct SecretsStore<D, C> {
    docs: D,
    clock: C,
}

impl<D, C> SecretsStore<D, C>
where
    D: DocumentService,
    C: Clock,
{
    pub fn new(docs: D, clock: C) -> Self {
        Self { docs, clock }
    }

    /// Store a new version of `name` and return it.
    pub async fn set_secret(
        &self,
        name: &str,
        value: &str,
        attributes: SecretAttributes,
    ) -> Result<SecretVersion, SecretsError> {
        let now_ms = self.clock.epoch_ms();
        let next = match self.docs.get(COLLECTION, name, META_ID).await? {
            Some(meta) => meta.get("next_version").and_then(Value::as_u64).unwrap_or(1),
            None => 1,
        };
        let version = SecretVersion {
            name: name.to_string(),
            version: format!("v{next}"),
            value: value.to_string(),
            enabled: attributes.enabled,
            created_at_ms: now_ms,
            expires_on_ms: attributes.expires_on_ms,
            content_type: attributes.content_type,
            tags: attributes.tags,
        };
        let doc = serde_json::to_value(&version).map_err(StoreError::from)?;
        // Expired versions are hidden by the document TTL and GC-able
        self.docs
            .upsert(COLLECTION, name, &version.version, doc, attributes.expires_on_ms)
            .await?;
        self.docs
            .upsert(COLLECTION, name, META_ID, json!({"next_version": next + 1}), None)
            .await?;
        Ok(version)
    }

    /// Fetch one version, or the latest enabled, non-expired version when
    /// `version` is omitted.
    pub async fn get_secret(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<SecretVersion, SecretsError> {
        let now_ms = self.clock.epoch_ms();
        match version {
            Some(version) => {
                let doc = self
                    .docs
                    .get(COLLECTION, name, version)
                    .await?
                    .ok_or_else(|| SecretsError::NotFound(name.to_string()))?;
                let secret: SecretVersion =
                    serde_json::from_value(doc).map_err(StoreError::from)?;
                if secret.is_usable(now_ms) {
                    Ok(secret)
                } else {
                    Err(SecretsError::NotFound(name.to_string()))
                }
            }
            None => self
                .versions(name)
                .await?
                .into_iter()
                .filter(|v| v.is_usable(now_ms))
                .max_by_key(|v| (v.created_at_ms, version_number(&v.version)))
                .ok_or_else(|| SecretsError::NotFound(name.to_string())),
        }
    }

    /// Soft-delete: all versions are disabled, history retained.
    pub async fn delete_secret(&self, name: &str) -> Result<(), SecretsError> {
        for mut version in self.versions(name).await? {
            version.enabled = false;
            let doc = serde_json::to_value(&version).map_err(StoreError::from)?;
            self.docs
                .upsert(COLLECTION, name, &version.version, doc, version.expires_on_ms)
                .await?;
        }
        Ok(())
    }

    /// Latest version properties per secret name. Never exposes values.
    pub async fn list_secrets(&self) -> Result<Vec<SecretProperties>, SecretsError> {
        let docs = self.docs.query(COLLECTION, DocQuery::default()).await?;
        let mut latest: HashMap<String, SecretVersion> = HashMap::new();
        for doc in docs {
            // Skip meta documents
            if doc.get("version").is_none() {
                continue;
            }
            let secret: SecretVersion = serde_json::from_value(doc).map_err(StoreError::from)?;
            let newer = latest
                .get(&secret.name)
                .is_none_or(|cur| version_number(&secret.version) > version_number(&cur.version));
            if newer {
                latest.insert(secret.name.clone(), secret);
            }
        }
        let mut properties: Vec<SecretProperties> =
            latest.into_values().map(|v| v.properties()).collect();
        properties.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(properties)
    }

    async fn versions(&self, name: &str) -> Result<Vec<SecretVersion>, SecretsError> {
        let docs = self.docs.query(COLLECTION, DocQuery::partition(name)).await?;
        let mut versions = Vec::with_capacity(docs.len());
        for doc in docs {
            if doc.get("version").is_none() {
                continue;
            }
            versions.push(serde_json::from_value(doc).map_err(StoreError::from)?);
        }
        Ok(versions)
    }
}

fn version_number(version: &str) -> u64 {
    version.strip_prefix('v').and_then(|n| n.parse().ok()).unwrap_or(0)
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
