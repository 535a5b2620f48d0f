//! Prepare, request and validate a rewrite

use crate::guardrails::{check_candidate, skip_reason, GuardrailConfig, RejectionReason, SkipReason};
use crate::scope::{resolve_scope, RewriteScope};
use crate::service::{
    parse_response, BlockPrompt, CompletionRequest, CompletionService, DEFAULT_SYSTEM_INSTRUCTION,
};
use crate::{Result, RewriteError};
use doc_model::{AuditEntry, AuditOperation, BlockChange, DocumentModel, NodeId};
use edit_engine::{EditAction, TextReplacement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RewriteConfig {
    pub guardrails: GuardrailConfig,
    /// Maximum blocks per service call
    pub batch_size: usize,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
    pub system_instruction: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            guardrails: GuardrailConfig::default(),
            batch_size: 30,
            timeout_ms: 60_000,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

impl RewriteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// What the caller asks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteRequest {
    pub scope: RewriteScope,
    #[serde(default)]
    pub selected_block_ids: Vec<NodeId>,
    pub instruction: String,
    /// Overrides the engine's guardrails for this request
    #[serde(default)]
    pub guardrails: Option<GuardrailConfig>,
    #[serde(default)]
    pub company_profile: Option<serde_json::Value>,
}

impl RewriteRequest {
    pub fn new(scope: RewriteScope, selected_block_ids: Vec<NodeId>, instruction: impl Into<String>) -> Self {
        Self {
            scope,
            selected_block_ids,
            instruction: instruction.into(),
            guardrails: None,
            company_profile: None,
        }
    }
}

/// A block captured for rewriting
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBlock {
    pub block_id: NodeId,
    pub text: String,
    /// `localVersion` at capture time
    pub local_version: u64,
}

/// Output of [`RewriteEngine::prepare`]
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRewrite {
    pub request: RewriteRequest,
    pub guardrails: GuardrailConfig,
    pub blocks: Vec<PreparedBlock>,
    pub skipped: Vec<(NodeId, SkipReason)>,
}

/// Parsed result of one batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchResult {
    Parsed(BTreeMap<String, String>),
    Invalid,
}

/// Service answer for one batch of blocks
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResponse {
    pub block_ids: Vec<NodeId>,
    pub result: BatchResult,
}

/// Result of validating a rewrite
#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub changes: Vec<BlockChange>,
    pub audit: AuditEntry,
}

impl RewriteOutcome {
    pub fn accepted(&self) -> impl Iterator<Item = &BlockChange> {
        self.changes.iter().filter(|c| c.accepted)
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted().count()
    }

    /// The editor action applying every accepted block, if any
    pub fn apply_action(&self) -> Option<EditAction> {
        let changes: Vec<TextReplacement> = self
            .accepted()
            .map(|c| TextReplacement {
                block_id: c.block_id,
                text: c.after.clone(),
            })
            .collect();
        (!changes.is_empty()).then_some(EditAction::ApplyRewrite { changes })
    }
}

/// Runs rewrites against a completion service
#[derive(Debug, Clone, Default)]
pub struct RewriteEngine {
    config: RewriteConfig,
}

impl RewriteEngine {
    pub fn new(config: RewriteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Resolve the scope, apply the pre-filters and capture block versions
    pub fn prepare(&self, model: &DocumentModel, request: RewriteRequest) -> PreparedRewrite {
        let guardrails = request
            .guardrails
            .clone()
            .unwrap_or_else(|| self.config.guardrails.clone());

        let mut blocks = Vec::new();
        let mut skipped = Vec::new();
        for id in resolve_scope(model, request.scope, &request.selected_block_ids) {
            let Some(paragraph) = model.find_paragraph(id) else {
                continue;
            };
            if let Some(reason) = skip_reason(model, paragraph, &guardrails) {
                debug!("Skipping block {} for rewrite: {:?}", id, reason);
                skipped.push((id, reason));
                continue;
            }
            blocks.push(PreparedBlock {
                block_id: id,
                text: paragraph.text(),
                local_version: paragraph.local_version,
            });
        }

        debug!(
            "Prepared {} rewrite with {} blocks ({} skipped)",
            request.scope.as_str(),
            blocks.len(),
            skipped.len()
        );
        PreparedRewrite {
            request,
            guardrails,
            blocks,
            skipped,
        }
    }

    /// Send the prepared blocks in batches. Any service failure or timeout
    /// fails the whole rewrite.
    pub async fn request<S: CompletionService>(
        &self,
        service: &S,
        prepared: &PreparedRewrite,
    ) -> Result<Vec<BatchResponse>> {
        if self.config.batch_size == 0 {
            return Err(RewriteError::InvalidRequest("batch size must be positive".into()));
        }

        let timeout = self.config.timeout();
        let mut responses = Vec::new();
        for batch in prepared.blocks.chunks(self.config.batch_size) {
            let request = CompletionRequest {
                system_instruction: self.config.system_instruction.clone(),
                blocks: batch
                    .iter()
                    .map(|b| BlockPrompt {
                        id: b.block_id.to_string(),
                        text: b.text.clone(),
                    })
                    .collect(),
                user_instruction: prepared.request.instruction.clone(),
                guardrail_summary: prepared.guardrails.summary(),
                company_profile: prepared.request.company_profile.clone(),
            };

            let raw = tokio::time::timeout(timeout, service.complete(&request))
                .await
                .map_err(|_| RewriteError::Timeout(timeout))??;

            let result = match parse_response(&raw) {
                Some(map) => BatchResult::Parsed(map),
                None => {
                    warn!("Completion response for {} blocks is not a JSON object", batch.len());
                    BatchResult::Invalid
                }
            };
            responses.push(BatchResponse {
                block_ids: batch.iter().map(|b| b.block_id).collect(),
                result,
            });
        }
        Ok(responses)
    }

    /// Check every returned block against the live model and the guardrails
    pub fn validate(
        &self,
        live: &DocumentModel,
        prepared: &PreparedRewrite,
        responses: &[BatchResponse],
        project_id: &str,
        actor: &str,
    ) -> RewriteOutcome {
        let captured: BTreeMap<NodeId, &PreparedBlock> =
            prepared.blocks.iter().map(|b| (b.block_id, b)).collect();

        let mut changes = Vec::new();
        for response in responses {
            for block_id in &response.block_ids {
                let Some(block) = captured.get(block_id) else {
                    continue;
                };
                let candidate = match &response.result {
                    BatchResult::Invalid => {
                        changes.push(BlockChange::rejected(
                            *block_id,
                            block.text.clone(),
                            "",
                            RejectionReason::InvalidAiResponse.to_string(),
                        ));
                        continue;
                    }
                    BatchResult::Parsed(map) => match map.get(&block_id.to_string()) {
                        Some(text) => text,
                        None => continue,
                    },
                };

                let verdict = match live.find_paragraph(*block_id) {
                    Some(p) if p.local_version == block.local_version => {
                        check_candidate(&block.text, candidate, &prepared.guardrails)
                    }
                    _ => Err(RejectionReason::ConcurrentModification),
                };

                changes.push(match verdict {
                    Ok(()) => BlockChange::accepted(*block_id, block.text.clone(), candidate.clone()),
                    Err(reason) => {
                        debug!("Rejected rewrite of block {}: {}", block_id, reason);
                        BlockChange::rejected(
                            *block_id,
                            block.text.clone(),
                            candidate.clone(),
                            reason.to_string(),
                        )
                    }
                });
            }
        }

        let audit = AuditEntry::new(project_id, AuditOperation::AiRewrite, actor)
            .with_scope(prepared.request.scope.as_str())
            .with_prompt(prepared.request.instruction.clone())
            .with_changes(changes.clone());
        info!(
            "Rewrite validated: {} accepted, {} rejected",
            audit.accepted_count(),
            audit.rejected_count()
        );
        RewriteOutcome { changes, audit }
    }

    /// Prepare, request and validate against the same model
    pub async fn run<S: CompletionService>(
        &self,
        service: &S,
        model: &DocumentModel,
        request: RewriteRequest,
        project_id: &str,
        actor: &str,
    ) -> Result<RewriteOutcome> {
        let prepared = self.prepare(model, request);
        let responses = self.request(service, &prepared).await?;
        Ok(self.validate(model, &prepared, &responses, project_id, actor))
    }
}
