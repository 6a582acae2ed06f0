//! Configuration for mirroring.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};

/// How [`DocumentSync::update`](crate::sync::DocumentSync::update) builds
/// its merge write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentUpdateMode {
    /// Write only the given fields plus the update stamp.
    #[default]
    PartialMerge,
    /// Write the locally mirrored fields overlaid with the given fields.
    /// Concurrent writers can lose updates: the last local view wins.
    LocalSnapshot,
}

/// Sync configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Tenant whose data is mirrored.
    pub tenant_id: String,

    /// Root collection holding one document per tenant.
    /// Default: "teams"
    #[serde(default = "default_tenant_collection")]
    pub tenant_collection: String,

    /// Field stamped with the server time on create.
    /// Default: "timestamp"
    #[serde(default = "default_created_field")]
    pub created_field: String,

    /// Field stamped with the server time on update.
    /// Default: "updatedAt"
    #[serde(default = "default_updated_field")]
    pub updated_field: String,

    /// Document mirrored when none is named.
    /// Default: "default"
    #[serde(default = "default_document_id")]
    pub default_document_id: String,

    #[serde(default)]
    pub document_update: DocumentUpdateMode,
}

fn default_tenant_collection() -> String {
    "teams".to_string()
}

fn default_created_field() -> String {
    "timestamp".to_string()
}

fn default_updated_field() -> String {
    "updatedAt".to_string()
}

fn default_document_id() -> String {
    "default".to_string()
}

impl SyncConfig {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            tenant_collection: default_tenant_collection(),
            created_field: default_created_field(),
            updated_field: default_updated_field(),
            default_document_id: default_document_id(),
            document_update: DocumentUpdateMode::default(),
        }
    }

    /// Parse from JSON; omitted fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SyncConfig =
            serde_json::from_str(json).map_err(|e| SyncError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Reject settings that would produce unusable paths or payloads.
    pub fn check(&self) -> Result<()> {
        let named = [
            ("tenant_id", &self.tenant_id),
            ("tenant_collection", &self.tenant_collection),
            ("created_field", &self.created_field),
            ("updated_field", &self.updated_field),
            ("default_document_id", &self.default_document_id),
        ];
        for (name, value) in named {
            if value.is_empty() {
                return Err(SyncError::Config(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }
}
