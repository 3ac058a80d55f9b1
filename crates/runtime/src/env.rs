// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment configuration: TOML file plus environment overrides

use loom_core::{Clock, SecretAttributes};
use loom_store::{DocumentService, SecretsError, SecretsStore};
use serde::Deserialize;
use std::path::Path;

/// Well-known secret names seeded from environment bindings.
///
/// Names are case-sensitive and lowercased-dashed; the matching environment
/// variable is the uppercased, underscored form (`azure-openai-api-key` ←
/// `AZURE_OPENAI_API_KEY`).
pub const WELL_KNOWN_SECRETS: &[&str] = &[
    "azure-openai-api-key",
    "azure-openai-endpoint",
    "azure-openai-deployment",
    "azure-openai-api-version",
];

/// Storage endpoints and sinks for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEnv {
    pub stream_url: String,
    pub kv_url: String,
    pub document_url: String,
    pub secrets_url: Option<String>,
    pub trace_sink: Option<String>,
}

/// File shape of the deployment config. Every field is optional; anything
/// omitted falls back to the environment, then to local-dev defaults.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    stream_url: Option<String>,
    #[serde(default)]
    kv_url: Option<String>,
    #[serde(default)]
    document_url: Option<String>,
    #[serde(default)]
    secrets_url: Option<String>,
    #[serde(default)]
    trace_sink: Option<String>,
}

impl RuntimeEnv {
    /// Resolve the deployment config: `loom.toml` (or `LOOM_CONFIG`) merged
    /// under environment overrides, with local-dev defaults last.
    pub fn from_env() -> Self {
        let path = var_or("LOOM_CONFIG", "loom.toml");
        Self::resolve(read_file_config(Path::new(&path)))
    }

    fn resolve(file: FileConfig) -> Self {
        Self {
            stream_url: setting("LOOM_STREAM_URL", file.stream_url, "redis://127.0.0.1:6379"),
            kv_url: setting("LOOM_KV_URL", file.kv_url, "redis://127.0.0.1:6379"),
            document_url: setting("LOOM_DOCUMENT_URL", file.document_url, "http://127.0.0.1:8081"),
            secrets_url: std::env::var("LOOM_SECRETS_URL").ok().or(file.secrets_url),
            trace_sink: std::env::var("LOOM_TRACE_SINK").ok().or(file.trace_sink),
        }
    }
}

/// Environment override wins over the file value, then the default.
fn setting(env_key: &str, file_value: Option<String>, default: &str) -> String {
    std::env::var(env_key)
        .ok()
        .or(file_value)
        .unwrap_or_else(|| default.to_string())
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// A missing config file is normal (env-only deployments); a file that does
/// not parse is reported and ignored.
fn read_file_config(path: &Path) -> FileConfig {
    let Ok(text) = std::fs::read_to_string(path) else {
        return FileConfig::default();
    };
    match toml::from_str(&text) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "config file does not parse, ignoring");
            FileConfig::default()
        }
    }
}

/// Seed well-known secrets from environment bindings.
///
/// Only names with a bound, non-empty environment variable are written, and
/// only when the store does not already hold a usable version; restarting a
/// deployment must not mint spurious secret versions. Returns the names
/// seeded.
pub async fn seed_secrets_from_env<D, C>(
    store: &SecretsStore<D, C>,
) -> Result<Vec<String>, SecretsError>
where
    D: DocumentService,
    C: Clock,
{
    let mut seeded = Vec::new();
    for name in WELL_KNOWN_SECRETS {
        let env_key = name.to_uppercase().replace('-', "_");
        let Ok(value) = std::env::var(&env_key) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        match store.get_secret(name, None).await {
            Ok(_) => continue,
            Err(SecretsError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        store.set_secret(name, &value, SecretAttributes::default()).await?;
        tracing::info!(secret = name, "seeded from environment");
        seeded.push(name.to_string());
    }
    Ok(seeded)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
