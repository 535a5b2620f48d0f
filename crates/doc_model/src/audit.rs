//! Audit trail records

use crate::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of operation an audit entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    ManualEdit,
    AiRewrite,
    ObjectMove,
    ObjectResize,
    ObjectUpdate,
    ObjectAdd,
    ObjectDelete,
    VersionRestore,
    Import,
    Export,
}

/// Before/after record for one block touched by an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockChange {
    pub block_id: NodeId,
    pub before: String,
    pub after: String,
    pub accepted: bool,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

impl BlockChange {
    pub fn accepted(block_id: NodeId, before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            block_id,
            before: before.into(),
            after: after.into(),
            accepted: true,
            rejection_reason: None,
        }
    }

    pub fn rejected(
        block_id: NodeId,
        before: impl Into<String>,
        after: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            block_id,
            before: before.into(),
            after: after.into(),
            accepted: false,
            rejection_reason: Some(reason.into()),
        }
    }
}

/// An immutable audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub project_id: String,
    pub operation: AuditOperation,
    /// Rewrite scope or object id, free-form
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub changes: Vec<BlockChange>,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(project_id: impl Into<String>, operation: AuditOperation, actor: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id: project_id.into(),
            operation,
            scope: None,
            prompt: None,
            changes: Vec::new(),
            actor: actor.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_changes(mut self, changes: Vec<BlockChange>) -> Self {
        self.changes = changes;
        self
    }

    pub fn accepted_count(&self) -> usize {
        self.changes.iter().filter(|c| c.accepted).count()
    }

    pub fn rejected_count(&self) -> usize {
        self.changes.len() - self.accepted_count()
    }
}
