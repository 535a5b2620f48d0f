//! The editor state machine

use crate::{ActionOutcome, EditAction, EditError, Result, TextReplacement, UndoManager};
use doc_model::{DocumentModel, DocumentObject, NodeId, ObjectPatch};

/// Owns the live model and its history.
///
/// Every mutating action works on a copy of the model; the copy replaces the
/// live model only when the whole action succeeded, and the previous model
/// becomes the undo snapshot.
#[derive(Debug, Clone)]
pub struct Editor {
    model: DocumentModel,
    history: UndoManager,
}

impl Editor {
    pub fn new(model: DocumentModel) -> Self {
        Self {
            model,
            history: UndoManager::new(),
        }
    }

    pub fn with_history_limit(model: DocumentModel, limit: usize) -> Self {
        Self {
            model,
            history: UndoManager::with_limit(limit),
        }
    }

    pub fn model(&self) -> &DocumentModel {
        &self.model
    }

    pub fn history(&self) -> &UndoManager {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Replace the live model without touching history (version restore)
    pub fn replace_model(&mut self, model: DocumentModel) {
        self.model = model;
    }

    /// Apply an action
    pub fn dispatch(&mut self, action: EditAction) -> Result<ActionOutcome> {
        match action {
            EditAction::Undo => Ok(self.undo()),
            EditAction::Redo => Ok(self.redo()),
            action => self.execute(action),
        }
    }

    pub fn undo(&mut self) -> ActionOutcome {
        if self.history.undo(&mut self.model) {
            ActionOutcome::Applied
        } else {
            ActionOutcome::NoOp
        }
    }

    pub fn redo(&mut self) -> ActionOutcome {
        if self.history.redo(&mut self.model) {
            ActionOutcome::Applied
        } else {
            ActionOutcome::NoOp
        }
    }

    fn execute(&mut self, action: EditAction) -> Result<ActionOutcome> {
        let mut next = self.model.clone();
        let changed = match action {
            EditAction::EditText { block_id, text } => edit_text(&mut next, block_id, &text)?,
            EditAction::MoveObject {
                object_id,
                x_px,
                y_px,
            } => move_object(&mut next, object_id, x_px, y_px)?,
            EditAction::ResizeObject {
                object_id,
                width_px,
                height_px,
            } => resize_object(&mut next, object_id, width_px, height_px)?,
            EditAction::UpdateObjectProperties { object_id, patch } => {
                update_object(&mut next, object_id, &patch)?
            }
            EditAction::DeleteObject { object_id } => {
                next.remove_object(object_id)
                    .map_err(|_| EditError::ObjectNotFound(object_id))?;
                true
            }
            EditAction::InsertObject { object } => insert_object(&mut next, *object)?,
            EditAction::ApplyRewrite { changes } => apply_rewrite(&mut next, &changes)?,
            EditAction::Undo | EditAction::Redo => {
                return Err(EditError::InvalidAction("history action".into()))
            }
        };

        if !changed {
            return Ok(ActionOutcome::NoOp);
        }

        let previous = std::mem::replace(&mut self.model, next);
        self.history.push(previous);
        Ok(ActionOutcome::Applied)
    }
}

fn edit_text(model: &mut DocumentModel, block_id: NodeId, text: &str) -> Result<bool> {
    let paragraph = model
        .find_paragraph(block_id)
        .ok_or(EditError::BlockNotFound(block_id))?;
    if !paragraph.has_text_run() {
        return Err(EditError::NoTextRun(block_id));
    }
    if paragraph.text() == text {
        return Ok(false);
    }
    model.set_paragraph_text(block_id, text)?;
    Ok(true)
}

fn move_object(model: &mut DocumentModel, id: NodeId, x_px: f64, y_px: f64) -> Result<bool> {
    if !x_px.is_finite() || !y_px.is_finite() {
        return Err(EditError::InvalidAction(format!("non-finite position for {}", id)));
    }
    let object = object_mut(model, id)?;
    object.x_px = x_px;
    object.y_px = y_px;
    object.local_version += 1;
    Ok(true)
}

fn resize_object(model: &mut DocumentModel, id: NodeId, width_px: f64, height_px: f64) -> Result<bool> {
    if !(width_px.is_finite() && height_px.is_finite() && width_px > 0.0 && height_px > 0.0) {
        return Err(EditError::InvalidAction(format!(
            "object size must be positive, got {}x{}",
            width_px, height_px
        )));
    }
    let object = object_mut(model, id)?;
    object.width_px = width_px;
    object.height_px = height_px;
    object.local_version += 1;
    Ok(true)
}

fn update_object(model: &mut DocumentModel, id: NodeId, patch: &ObjectPatch) -> Result<bool> {
    let object = object_mut(model, id)?;
    if patch.is_empty() {
        return Ok(false);
    }
    patch.apply_to(object);
    object.local_version += 1;
    model.refresh_object_flags();
    Ok(true)
}

fn insert_object(model: &mut DocumentModel, object: DocumentObject) -> Result<bool> {
    if model.object(object.id).is_some() {
        return Err(EditError::InvalidAction(format!(
            "object {} already exists",
            object.id
        )));
    }
    if object.width_px <= 0.0 || object.height_px <= 0.0 {
        return Err(EditError::InvalidAction("inserted object needs a size".into()));
    }
    model.insert_object(object);
    Ok(true)
}

fn apply_rewrite(model: &mut DocumentModel, changes: &[TextReplacement]) -> Result<bool> {
    let mut changed = false;
    for change in changes {
        changed |= edit_text(model, change.block_id, &change.text)?;
    }
    Ok(changed)
}

fn object_mut(model: &mut DocumentModel, id: NodeId) -> Result<&mut DocumentObject> {
    model.object_mut(id).map_err(|_| EditError::ObjectNotFound(id))
}
