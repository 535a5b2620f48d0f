//! Error types for storage operations

use crate::docx::{ExportError, ImportError};
use doc_model::AssetId;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Document model error: {0}")]
    DocModel(#[from] doc_model::DocModelError),

    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Edit failed: {0}")]
    Edit(#[from] edit_engine::EditError),

    #[error("Rewrite failed: {0}")]
    Rewrite(#[from] rewrite::RewriteError),

    #[error("Workspace not found for project {0}")]
    WorkspaceNotFound(String),

    #[error("Version not found: {0}")]
    VersionNotFound(Uuid),

    #[error("Asset not found: {0}")]
    AssetNotFound(AssetId),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
