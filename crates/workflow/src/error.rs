// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow error types

use crate::compiler::CompileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The definition failed structural validation.
    #[error("workflow is invalid: {}", format_errors(.0))]
    Invalid(Vec<CompileError>),

    /// No runnable action remains while unfinished actions exist.
    #[error("Cannot make progress")]
    NoProgress,

    /// An action failed without a handler allowing the failure.
    #[error("action '{name}' failed: {message}")]
    ActionFailed { name: String, message: String },

    #[error("expression error: {0}")]
    Expression(String),

    #[error(transparent)]
    Store(#[from] loom_store::StoreError),
}

fn format_errors(errors: &[CompileError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from the versioned workflow store.
#[derive(Debug, Error)]
pub enum WorkflowStoreError {
    #[error("workflow already exists: {0}")]
    AlreadyExists(loom_core::WorkflowId),
    #[error("workflow not found: {0}")]
    NotFound(loom_core::WorkflowId),
    #[error("invalid version '{version}': {detail}")]
    InvalidVersion { version: String, detail: String },
    #[error(transparent)]
    Store(#[from] loom_store::StoreError),
}
