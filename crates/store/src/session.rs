//! Project sessions
//!
//! A [`ProjectSession`] is the application root for one project. It owns
//! the editor and the pristine source binary, persists every applied action
//! through the shared [`WorkspaceRepository`] and records the audit trail.

use crate::docx::{sha256_hex, DocxExporter, DocxImporter, ExportedDocument, ImportWarning};
use crate::integrity::{IntegrityChecker, IntegrityReport};
use crate::settings::CanvasSettings;
use crate::workspace::{BlobStore, MemoryBlobStore, WorkspaceRepository, WorkspaceStorage};
use crate::Result;
use doc_model::{Asset, AssetId, AuditEntry, AuditOperation, BlockChange, DocumentModel, VersionInfo};
use edit_engine::{ActionOutcome, EditAction, Editor};
use rewrite::{CompletionService, RewriteEngine, RewriteOutcome, RewriteRequest};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub struct ProjectSession<S: WorkspaceStorage, B: BlobStore = MemoryBlobStore> {
    repository: Arc<WorkspaceRepository<S, B>>,
    project_id: String,
    actor: String,
    editor: Editor,
    source: Vec<u8>,
    /// Every asset of the project; the exporter skips those already in
    /// the source archive
    assets: Vec<Asset>,
}

impl<S: WorkspaceStorage, B: BlobStore> ProjectSession<S, B> {
    /// Import a DOCX into a new workspace
    pub fn import(
        repository: Arc<WorkspaceRepository<S, B>>,
        project_id: &str,
        bytes: Vec<u8>,
        source_filename: Option<&str>,
        settings: &CanvasSettings,
    ) -> Result<(Self, Vec<ImportWarning>)> {
        let importer = DocxImporter::new(settings.classifier.clone(), settings.layout.clone());
        let imported = importer.import(&bytes, project_id, source_filename)?;

        repository.create_workspace(project_id, imported.model.clone(), bytes.clone())?;
        let mut assets = Vec::with_capacity(imported.assets.len());
        for asset in imported.assets {
            assets.push(repository.add_asset(asset)?);
        }

        let actor = settings.editor.default_actor.clone();
        repository.append_audit(
            AuditEntry::new(project_id, AuditOperation::Import, actor.as_str())
                .with_scope(source_filename.unwrap_or("document.docx")),
        )?;

        let session = Self {
            repository,
            project_id: project_id.to_string(),
            actor,
            editor: Editor::with_history_limit(imported.model, settings.editor.history_limit),
            source: bytes,
            assets,
        };
        Ok((session, imported.warnings))
    }

    /// Reopen a stored workspace with an empty history
    pub fn open(
        repository: Arc<WorkspaceRepository<S, B>>,
        project_id: &str,
        settings: &CanvasSettings,
    ) -> Result<Self> {
        let workspace = repository.get_workspace(project_id)?;
        let assets = workspace
            .asset_ids
            .iter()
            .map(|id| repository.get_asset(project_id, *id))
            .collect::<Result<Vec<_>>>()?;
        debug!("Opened project {} with {} assets", project_id, assets.len());

        Ok(Self {
            repository,
            project_id: project_id.to_string(),
            actor: settings.editor.default_actor.clone(),
            editor: Editor::with_history_limit(workspace.model, settings.editor.history_limit),
            source: workspace.source_binary,
            assets,
        })
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn model(&self) -> &DocumentModel {
        self.editor.model()
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn repository(&self) -> &Arc<WorkspaceRepository<S, B>> {
        &self.repository
    }

    /// Apply an editor action, persist the model and audit it
    pub fn dispatch(&mut self, action: EditAction) -> Result<ActionOutcome> {
        let operation = action.audit_operation();
        let target = action.target();
        let edited = match &action {
            EditAction::EditText { block_id, text } => self
                .model()
                .find_paragraph(*block_id)
                .map(|p| BlockChange::accepted(*block_id, p.text(), text.clone())),
            _ => None,
        };

        let outcome = self.editor.dispatch(action)?;
        if outcome == ActionOutcome::NoOp {
            return Ok(outcome);
        }
        self.persist()?;

        if let Some(operation) = operation {
            let mut entry = AuditEntry::new(self.project_id.as_str(), operation, self.actor.as_str());
            if let Some(target) = target {
                entry = entry.with_scope(target.to_string());
            }
            if let Some(change) = edited {
                entry = entry.with_changes(vec![change]);
            }
            self.repository.append_audit(entry)?;
        }
        Ok(outcome)
    }

    pub fn undo(&mut self) -> Result<ActionOutcome> {
        self.dispatch(EditAction::Undo)
    }

    pub fn redo(&mut self) -> Result<ActionOutcome> {
        self.dispatch(EditAction::Redo)
    }

    /// Run a rewrite and apply the accepted blocks as a single undo step.
    /// Service failures leave the model untouched and are not audited.
    pub async fn rewrite<C: CompletionService>(
        &mut self,
        engine: &RewriteEngine,
        service: &C,
        request: RewriteRequest,
    ) -> Result<RewriteOutcome> {
        let prepared = engine.prepare(self.editor.model(), request);
        let responses = engine.request(service, &prepared).await?;
        let outcome = engine.validate(
            self.editor.model(),
            &prepared,
            &responses,
            &self.project_id,
            &self.actor,
        );

        if let Some(action) = outcome.apply_action() {
            if self.editor.dispatch(action)? == ActionOutcome::Applied {
                self.persist()?;
            }
        }
        self.repository.append_audit(outcome.audit.clone())?;
        Ok(outcome)
    }

    /// Export the current model against the source binary
    pub fn export(&self) -> Result<ExportedDocument> {
        let exported = DocxExporter::new().export(self.model(), &self.source, &self.assets)?;
        self.repository.append_audit(
            AuditEntry::new(self.project_id.as_str(), AuditOperation::Export, self.actor.as_str())
                .with_scope(sha256_hex(&exported.bytes)),
        )?;
        Ok(exported)
    }

    /// Snapshot the current model together with its exported binary
    pub fn save_version(&self, name: &str) -> Result<VersionInfo> {
        let exported = DocxExporter::new().export(self.model(), &self.source, &self.assets)?;
        self.repository.create_version(
            &self.project_id,
            name,
            self.model().clone(),
            exported.bytes,
            &self.actor,
        )
    }

    /// Replace the live model with a saved version. Undo history is kept,
    /// so the restore itself is not an undoable step.
    pub fn restore_version(&mut self, version_id: Uuid) -> Result<()> {
        let workspace = self
            .repository
            .restore_version(&self.project_id, version_id, &self.actor)?;
        self.editor.replace_model(workspace.model);
        info!("Session {} restored version {}", self.project_id, version_id);
        Ok(())
    }

    /// Store a new image for use by inserted objects
    pub fn add_asset(&mut self, data: Vec<u8>, filename: &str, mime_type: &str) -> Result<Asset> {
        let id = AssetId::new();
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "bin".to_string());
        let asset = self.repository.add_asset(Asset {
            id,
            sha256: sha256_hex(&data),
            data,
            mime_type: mime_type.to_string(),
            // Unique name so it never collides with the source's media
            filename: format!("canvas-{}.{}", id, extension),
            project_id: self.project_id.clone(),
            source_path: None,
        })?;
        if !self.assets.iter().any(|a| a.id == asset.id) {
            self.assets.push(asset.clone());
        }
        Ok(asset)
    }

    pub fn check_integrity(&self) -> IntegrityReport {
        IntegrityChecker::new().check(self.model(), &self.assets)
    }

    fn persist(&self) -> Result<()> {
        self.repository.update_workspace(&self.project_id, self.model())?;
        Ok(())
    }
}
