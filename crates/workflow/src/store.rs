// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned workflow storage

use crate::definition::WorkflowDefinition;
use crate::error::WorkflowStoreError;
use loom_core::{Clock, WorkflowId};
use loom_store::{DocQuery, DocumentService, StoreError};
use serde::{Deserialize, Serialize};

const COLLECTION: &str = "workflows";

/// How to bump the version on publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
    Major,
    Minor,
    Patch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    pub id: WorkflowId,
    pub version: String,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// One stored workflow version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowVersion {
    pub metadata: WorkflowMetadata,
    pub definition: WorkflowDefinition,
}

/// Workflow store over the document capability, partitioned by workflow id.
///
/// `create` pins 1.0.0; `publish` applies strict semver bumps.
#[derive(Clone)]
pub struct WorkflowStore<D, C> {
    docs: D,
    clock: C,
}

impl<D, C> WorkflowStore<D, C>
where
    D: DocumentService,
    C: Clock,
{
    pub fn new(docs: D, clock: C) -> Self {
        Self { docs, clock }
    }

    /// Store a new workflow at version 1.0.0. Duplicate creates fail.
    pub async fn create(
        &self,
        id: impl Into<WorkflowId>,
        definition: WorkflowDefinition,
    ) -> Result<WorkflowVersion, WorkflowStoreError> {
        let id = id.into();
        if !self.versions_of(&id).await?.is_empty() {
            return Err(WorkflowStoreError::AlreadyExists(id));
        }
        self.put(&id, "1.0.0", definition, None).await
    }

    /// Publish a new version, bumping from the latest.
    pub async fn publish(
        &self,
        id: impl Into<WorkflowId>,
        definition: WorkflowDefinition,
        bump: VersionBump,
    ) -> Result<WorkflowVersion, WorkflowStoreError> {
        let id = id.into();
        let latest = self.get(&id).await?;
        let current = semver::Version::parse(&latest.metadata.version).map_err(|e| {
            WorkflowStoreError::InvalidVersion {
                version: latest.metadata.version.clone(),
                detail: e.to_string(),
            }
        })?;
        let next = match bump {
            VersionBump::Major => semver::Version::new(current.major + 1, 0, 0),
            VersionBump::Minor => semver::Version::new(current.major, current.minor + 1, 0),
            VersionBump::Patch => {
                semver::Version::new(current.major, current.minor, current.patch + 1)
            }
        };
        self.put(&id, &next.to_string(), definition, Some(latest.metadata.created_at_ms))
            .await
    }

    /// Latest version by semver.
    pub async fn get(&self, id: &WorkflowId) -> Result<WorkflowVersion, WorkflowStoreError> {
        self.versions_of(id)
            .await?
            .into_iter()
            .max_by_key(|v| parse_version(&v.metadata.version))
            .ok_or_else(|| WorkflowStoreError::NotFound(id.clone()))
    }

    pub async fn get_version(
        &self,
        id: &WorkflowId,
        version: &str,
    ) -> Result<WorkflowVersion, WorkflowStoreError> {
        let doc = self
            .docs
            .get(COLLECTION, id.as_str(), version)
            .await
            .map_err(WorkflowStoreError::Store)?
            .ok_or_else(|| WorkflowStoreError::NotFound(id.clone()))?;
        Ok(serde_json::from_value(doc).map_err(StoreError::from)?)
    }

    /// All versions in creation order.
    pub async fn list_versions(
        &self,
        id: &WorkflowId,
    ) -> Result<Vec<WorkflowVersion>, WorkflowStoreError> {
        let mut versions = self.versions_of(id).await?;
        versions.sort_by_key(|v| (v.metadata.updated_at_ms, parse_version(&v.metadata.version)));
        Ok(versions)
    }

    pub async fn delete(&self, id: &WorkflowId) -> Result<u64, WorkflowStoreError> {
        let versions = self.versions_of(id).await?;
        let mut deleted = 0;
        for version in &versions {
            if self
                .docs
                .delete(COLLECTION, id.as_str(), &version.metadata.version)
                .await
                .map_err(WorkflowStoreError::Store)?
            {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn put(
        &self,
        id: &WorkflowId,
        version: &str,
        definition: WorkflowDefinition,
        created_at_ms: Option<u64>,
    ) -> Result<WorkflowVersion, WorkflowStoreError> {
        let now_ms = self.clock.epoch_ms();
        let stored = WorkflowVersion {
            metadata: WorkflowMetadata {
                id: id.clone(),
                version: version.to_string(),
                created_at_ms: created_at_ms.unwrap_or(now_ms),
                updated_at_ms: now_ms,
                description: None,
                tags: Vec::new(),
            },
            definition,
        };
        let doc = serde_json::to_value(&stored).map_err(StoreError::from)?;
        self.docs
            .upsert(COLLECTION, id.as_str(), version, doc, None)
            .await
            .map_err(WorkflowStoreError::Store)?;
        Ok(stored)
    }

    async fn versions_of(
        &self,
        id: &WorkflowId,
    ) -> Result<Vec<WorkflowVersion>, WorkflowStoreError> {
        let docs = self
            .docs
            .query(COLLECTION, DocQuery::partition(id.as_str()))
            .await
            .map_err(WorkflowStoreError::Store)?;
        let mut versions = Vec::with_capacity(docs.len());
        for doc in docs {
            versions.push(serde_json::from_value(doc).map_err(StoreError::from)?);
        }
        Ok(versions)
    }
}

fn parse_version(version: &str) -> (u64, u64, u64) {
    semver::Version::parse(version)
        .map(|v| (v.major, v.minor, v.patch))
        .unwrap_or((0, 0, 0))
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
