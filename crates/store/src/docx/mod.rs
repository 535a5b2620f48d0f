//! DOCX Import/Export Module
//!
//! A DOCX file is a ZIP archive of XML parts:
//! - `[Content_Types].xml` - content type definitions
//! - `word/document.xml` - main document content
//! - `word/header*.xml`, `word/footer*.xml` - header and footer content
//! - `word/styles.xml` - style definitions
//! - `word/_rels/<part>.rels` - per-part relationships
//! - `word/media/` - embedded images
//!
//! Import builds a [`doc_model::DocumentModel`] from these parts. Export
//! never regenerates a part: it patches the original XML in place, so
//! anything the model does not cover survives byte for byte.

mod assets;
mod classify;
mod content_types;
mod error;
mod exporter;
mod importer;
mod layout;
mod reader;
mod redistribute;
mod relationships;
mod styles;
pub mod xml_index;

pub use assets::{sha256_hex, AssetExtractor, ImageFormat};
pub use classify::{Band, Classification, ClassificationInput, ClassifierConfig, ImageClassifier};
pub use content_types::{insert_default, media_content_type, ContentTypes, CONTENT_TYPES_PART};
pub use error::{DocxError, DocxResult, ExportError, ExportResult, ImportError};
pub use exporter::{media_path, DocxExporter, ExportReport, ExportedDocument};
pub use importer::{parse_geometry, DocxImporter, ImportResult, ImportWarning, WarningKind, STYLES_PART};
pub use layout::{LayoutConfig, PageEstimator};
pub use reader::{DocxReader, XmlParser};
pub use redistribute::redistribute;
pub use relationships::{rels_path_for, resolve_target, Relationship, Relationships};
pub use styles::{flatten_property, run_style_key, StylesParser};
