//! Named, immutable document snapshots

use crate::asset::base64_bytes;
use crate::DocumentModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A saved version of a project's document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: Uuid,
    pub project_id: String,
    pub name: String,
    pub model: DocumentModel,
    /// Exported DOCX at the time of the snapshot
    #[serde(with = "base64_bytes")]
    pub binary: Vec<u8>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Version {
    pub fn new(
        project_id: impl Into<String>,
        name: impl Into<String>,
        model: DocumentModel,
        binary: Vec<u8>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id: project_id.into(),
            name: name.into(),
            model,
            binary,
            created_by: created_by.into(),
            created_at: Utc::now(),
        }
    }
}

/// Listing entry without the heavy payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub id: Uuid,
    pub name: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Version> for VersionInfo {
    fn from(v: &Version) -> Self {
        Self {
            id: v.id,
            name: v.name.clone(),
            created_by: v.created_by.clone(),
            created_at: v.created_at,
        }
    }
}
