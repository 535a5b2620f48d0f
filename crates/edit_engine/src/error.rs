//! Error types for editing operations

use doc_model::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    #[error("Paragraph {0} has no text run")]
    NoTextRun(NodeId),

    #[error("Block not found: {0}")]
    BlockNotFound(NodeId),

    #[error("Document object not found: {0}")]
    ObjectNotFound(NodeId),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Document model error: {0}")]
    DocModel(#[from] doc_model::DocModelError),
}

pub type Result<T> = std::result::Result<T, EditError>;
