//! Editor actions

use doc_model::{AuditOperation, DocumentObject, NodeId, ObjectPatch};
use serde::{Deserialize, Serialize};

/// New text for one paragraph, produced by an accepted AI rewrite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextReplacement {
    pub block_id: NodeId,
    pub text: String,
}

/// Everything the editor can do to a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditAction {
    #[serde(rename_all = "camelCase")]
    EditText { block_id: NodeId, text: String },
    #[serde(rename_all = "camelCase")]
    MoveObject { object_id: NodeId, x_px: f64, y_px: f64 },
    #[serde(rename_all = "camelCase")]
    ResizeObject {
        object_id: NodeId,
        width_px: f64,
        height_px: f64,
    },
    #[serde(rename_all = "camelCase")]
    UpdateObjectProperties { object_id: NodeId, patch: ObjectPatch },
    #[serde(rename_all = "camelCase")]
    DeleteObject { object_id: NodeId },
    InsertObject { object: Box<DocumentObject> },
    /// All accepted blocks of one rewrite, applied as a single undo step
    ApplyRewrite { changes: Vec<TextReplacement> },
    Undo,
    Redo,
}

impl EditAction {
    pub fn display_name(&self) -> &'static str {
        match self {
            EditAction::EditText { .. } => "Edit Text",
            EditAction::MoveObject { .. } => "Move Object",
            EditAction::ResizeObject { .. } => "Resize Object",
            EditAction::UpdateObjectProperties { .. } => "Update Object",
            EditAction::DeleteObject { .. } => "Delete Object",
            EditAction::InsertObject { .. } => "Insert Object",
            EditAction::ApplyRewrite { .. } => "Apply Rewrite",
            EditAction::Undo => "Undo",
            EditAction::Redo => "Redo",
        }
    }

    /// Audit operation recorded for this action. Undo, redo and rewrites
    /// are audited by their callers.
    pub fn audit_operation(&self) -> Option<AuditOperation> {
        match self {
            EditAction::EditText { .. } => Some(AuditOperation::ManualEdit),
            EditAction::MoveObject { .. } => Some(AuditOperation::ObjectMove),
            EditAction::ResizeObject { .. } => Some(AuditOperation::ObjectResize),
            EditAction::UpdateObjectProperties { .. } => Some(AuditOperation::ObjectUpdate),
            EditAction::DeleteObject { .. } => Some(AuditOperation::ObjectDelete),
            EditAction::InsertObject { .. } => Some(AuditOperation::ObjectAdd),
            EditAction::ApplyRewrite { .. } | EditAction::Undo | EditAction::Redo => None,
        }
    }

    /// Id of the block or object the action targets
    pub fn target(&self) -> Option<NodeId> {
        match self {
            EditAction::EditText { block_id, .. } => Some(*block_id),
            EditAction::MoveObject { object_id, .. }
            | EditAction::ResizeObject { object_id, .. }
            | EditAction::UpdateObjectProperties { object_id, .. }
            | EditAction::DeleteObject { object_id } => Some(*object_id),
            EditAction::InsertObject { object } => Some(object.id),
            EditAction::ApplyRewrite { .. } | EditAction::Undo | EditAction::Redo => None,
        }
    }
}

/// What dispatching an action did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The model changed
    Applied,
    /// Nothing to do (empty history, unchanged text, empty rewrite)
    NoOp,
}
