//! Error types for DOCX operations

use thiserror::Error;

/// Low-level container and XML errors
#[derive(Debug, Error)]
pub enum DocxError {
    /// IO error (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML parsing error
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Invalid DOCX structure
    #[error("Invalid DOCX structure: {0}")]
    InvalidStructure(String),

    /// Missing required part
    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// UTF-8 encoding error
    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<quick_xml::Error> for DocxError {
    fn from(err: quick_xml::Error) -> Self {
        DocxError::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for DocxError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        DocxError::XmlParse(format!("Attribute error: {}", err))
    }
}

/// Result type for DOCX operations
pub type DocxResult<T> = std::result::Result<T, DocxError>;

/// Fatal import failure
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Not a valid DOCX archive: {0}")]
    InvalidArchive(String),

    #[error("Missing main document part {0}")]
    MissingMainPart(String),

    #[error("Malformed part {part}: {source}")]
    MalformedPart {
        part: String,
        #[source]
        source: DocxError,
    },
}

impl From<DocxError> for ImportError {
    fn from(err: DocxError) -> Self {
        match err {
            DocxError::MissingPart(part) => ImportError::MissingMainPart(part),
            other => ImportError::InvalidArchive(other.to_string()),
        }
    }
}

/// Fatal export failure
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Cannot read original binary: {0}")]
    Source(#[from] DocxError),

    #[error("Integrity check failed for block {block_id} in {xml_path}: {detail}")]
    Integrity {
        block_id: doc_model::NodeId,
        xml_path: String,
        detail: String,
    },

    #[error("Cannot write archive: {0}")]
    Write(String),
}

impl From<zip::result::ZipError> for ExportError {
    fn from(err: zip::result::ZipError) -> Self {
        ExportError::Write(err.to_string())
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Write(err.to_string())
    }
}

pub type ExportResult<T> = std::result::Result<T, ExportError>;
