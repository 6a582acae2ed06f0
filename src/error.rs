//! Error types for live mirroring.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which mutation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Add,
    Update,
    Merge,
    Remove,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationKind::Add => "add",
            MutationKind::Update => "update",
            MutationKind::Merge => "merge",
            MutationKind::Remove => "remove",
        };
        f.write_str(name)
    }
}

/// Main error type for sync operations.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SyncError {
    #[error("Subscription setup failed: {0}")]
    SubscriptionSetup(String),

    #[error("Subscription notification failed: {0}")]
    SubscriptionNotification(String),

    #[error("Mutation {op} failed: {message}")]
    Mutation { op: MutationKind, message: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// The bare message recorded into observable state.
    ///
    /// Wrapping variants (setup, notification, mutation) expose the inner
    /// message so observers see what the store reported.
    pub fn message(&self) -> String {
        match self {
            SyncError::SubscriptionSetup(msg)
            | SyncError::SubscriptionNotification(msg)
            | SyncError::Mutation { message: msg, .. } => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Wrap a store failure as a mutation error.
    pub(crate) fn mutation(op: MutationKind, source: &SyncError) -> Self {
        SyncError::Mutation {
            op,
            message: source.message(),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
