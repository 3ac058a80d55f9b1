// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned secret model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attributes supplied when setting a secret version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretAttributes {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Epoch ms after which the version is hidden and GC-able.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for SecretAttributes {
    fn default() -> Self {
        Self {
            enabled: true,
            expires_on_ms: None,
            content_type: None,
            tags: HashMap::new(),
        }
    }
}

/// One stored version of a secret, value included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretVersion {
    pub name: String,
    pub version: String,
    pub value: String,
    pub enabled: bool,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

impl SecretVersion {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_on_ms.is_some_and(|exp| now_ms >= exp)
    }

    /// Visible to `get_secret` without an explicit version.
    pub fn is_usable(&self, now_ms: u64) -> bool {
        self.enabled && !self.is_expired(now_ms)
    }

    /// Value-free view for listings.
    pub fn properties(&self) -> SecretProperties {
        SecretProperties {
            name: self.name.clone(),
            version: self.version.clone(),
            enabled: self.enabled,
            created_at_ms: self.created_at_ms,
            expires_on_ms: self.expires_on_ms,
            content_type: self.content_type.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Listing view of a secret version. Never carries the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretProperties {
    pub name: String,
    pub version: String,
    pub enabled: bool,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

#[cfg(test)]
#[path = "secret_tests.rs"]
mod tests;
