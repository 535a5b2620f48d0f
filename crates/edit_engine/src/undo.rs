//! Snapshot-based undo/redo history

use doc_model::DocumentModel;
use std::collections::VecDeque;

/// Default number of snapshots kept on each stack
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Bounded undo and redo stacks of full model snapshots
#[derive(Debug, Clone)]
pub struct UndoManager {
    undo_stack: VecDeque<DocumentModel>,
    redo_stack: VecDeque<DocumentModel>,
    max_entries: usize,
}

impl UndoManager {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// A limit of zero is raised to one
    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record the model as it was before an action. Clears the redo stack.
    pub fn push(&mut self, snapshot: DocumentModel) {
        self.redo_stack.clear();
        push_bounded(&mut self.undo_stack, snapshot, self.max_entries);
    }

    /// Swap `current` with the previous snapshot. Returns false when there
    /// is nothing to undo.
    pub fn undo(&mut self, current: &mut DocumentModel) -> bool {
        let Some(previous) = self.undo_stack.pop_back() else {
            return false;
        };
        let replaced = std::mem::replace(current, previous);
        push_bounded(&mut self.redo_stack, replaced, self.max_entries);
        true
    }

    /// Swap `current` with the next snapshot. Returns false when there is
    /// nothing to redo.
    pub fn redo(&mut self, current: &mut DocumentModel) -> bool {
        let Some(next) = self.redo_stack.pop_back() else {
            return false;
        };
        let replaced = std::mem::replace(current, next);
        push_bounded(&mut self.undo_stack, replaced, self.max_entries);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}

fn push_bounded(stack: &mut VecDeque<DocumentModel>, snapshot: DocumentModel, max: usize) {
    stack.push_back(snapshot);
    while stack.len() > max {
        stack.pop_front();
    }
}
