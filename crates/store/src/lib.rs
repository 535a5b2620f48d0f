//! Store - DOCX round-trip, persistence and project sessions
//!
//! The [`docx`] module imports a DOCX binary into a
//! [`doc_model::DocumentModel`] and patches the edited model back into the
//! original binary. [`WorkspaceRepository`] persists workspaces, assets,
//! versions and the audit trail; [`ProjectSession`] ties both to an editor.

mod error;
mod integrity;
mod session;
mod settings;
mod workspace;
pub mod docx;

pub use error::*;
pub use integrity::*;
pub use session::*;
pub use settings::*;
pub use workspace::*;

pub use docx::{
    DocxExporter, DocxImporter, ExportError, ExportReport, ExportedDocument, ImportError,
    ImportResult, ImportWarning, WarningKind,
};
