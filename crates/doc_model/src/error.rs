//! Error types for document model operations

use crate::{AssetId, NodeId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocModelError {
    #[error("Block not found: {0}")]
    BlockNotFound(NodeId),

    #[error("Document object not found: {0}")]
    ObjectNotFound(NodeId),

    #[error("Asset not found: {0}")]
    AssetNotFound(AssetId),

    #[error("Block {0} is not a paragraph")]
    NotAParagraph(NodeId),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, DocModelError>;
