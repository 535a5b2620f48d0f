//! Project session, workspace repository and version store tests

mod common;

use common::*;
use doc_model::{AuditOperation, DocumentModel, DocumentObject, ObjectType};
use edit_engine::{ActionOutcome, EditAction};
use rewrite::{RewriteEngine, RewriteRequest, RewriteScope, ScriptedCompletionService};
use std::sync::Arc;
use store::{
    CanvasSettings, FileStorage, MemoryStorage, ProjectSession, StoreError, WorkspaceRepository,
    WorkspaceStorage,
};
use tempfile::TempDir;
use uuid::Uuid;

fn fixture() -> Vec<u8> {
    DocxBuilder::new()
        .body(paragraph(&[run("Die "), bold_run("{{FIRMA_NAME}}"), run(" liefert Teile.")]))
        .body(paragraph(&[run("Zweiter Absatz")]))
        .build()
}

fn session() -> ProjectSession<MemoryStorage> {
    let repository = Arc::new(WorkspaceRepository::new(MemoryStorage::new()));
    let (session, warnings) =
        ProjectSession::import(repository, "p1", fixture(), Some("qm.docx"), &CanvasSettings::default())
            .unwrap();
    assert!(warnings.is_empty());
    session
}

fn edit<S: WorkspaceStorage>(session: &mut ProjectSession<S>, index: usize, text: &str) -> ActionOutcome {
    let block_id = session.model().blocks[index].id();
    session
        .dispatch(EditAction::EditText {
            block_id,
            text: text.into(),
        })
        .unwrap()
}

#[test]
fn test_import_records_audit_and_persists() {
    let session = session();
    let audit = session.repository().list_audit("p1").unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].operation, AuditOperation::Import);
    assert_eq!(audit[0].scope.as_deref(), Some("qm.docx"));

    let workspace = session.repository().get_workspace("p1").unwrap();
    assert_eq!(&workspace.model, session.model());
    assert_eq!(workspace.source_binary, fixture());
    assert!(session.check_integrity().is_valid);
}

#[test]
fn test_undo_redo_flow() {
    let mut session = session();
    for text in ["eins", "zwei", "drei"] {
        assert_eq!(edit(&mut session, 1, text), ActionOutcome::Applied);
    }
    assert_eq!(session.model().blocks[1].text(), "drei");

    for _ in 0..3 {
        assert_eq!(session.undo().unwrap(), ActionOutcome::Applied);
    }
    assert_eq!(session.model().blocks[1].text(), "Zweiter Absatz");
    assert_eq!(session.undo().unwrap(), ActionOutcome::NoOp);

    assert_eq!(session.redo().unwrap(), ActionOutcome::Applied);
    assert_eq!(session.model().blocks[1].text(), "eins");

    // A new edit clears the redo stack
    edit(&mut session, 1, "neu");
    assert!(!session.editor().can_redo());
    assert_eq!(session.redo().unwrap(), ActionOutcome::NoOp);

    let stored = session.repository().get_workspace("p1").unwrap();
    assert_eq!(stored.model.blocks[1].text(), "neu");
}

#[test]
fn test_manual_edit_audit() {
    let mut session = session().with_actor("anna");
    edit(&mut session, 1, "Neuer Absatz");
    // Unchanged text is a no-op and is not audited
    assert_eq!(edit(&mut session, 1, "Neuer Absatz"), ActionOutcome::NoOp);

    let audit = session.repository().list_audit("p1").unwrap();
    assert_eq!(audit.len(), 2);
    let entry = &audit[1];
    assert_eq!(entry.operation, AuditOperation::ManualEdit);
    assert_eq!(entry.actor, "anna");
    assert_eq!(entry.changes[0].before, "Zweiter Absatz");
    assert_eq!(entry.changes[0].after, "Neuer Absatz");
}

#[test]
fn test_inserted_object_media_is_exported() {
    let mut session = session();
    let asset = session.add_asset(PNG.to_vec(), "Logo.PNG", "image/png").unwrap();
    assert!(asset.filename.ends_with(".png"));

    let mut object = DocumentObject::new(ObjectType::Logo, Some(asset.id));
    object.width_px = 120.0;
    object.height_px = 40.0;
    session
        .dispatch(EditAction::InsertObject {
            object: Box::new(object),
        })
        .unwrap();

    let exported = session.export().unwrap();
    assert_eq!(exported.report.added_media, vec![format!("word/media/{}", asset.filename)]);
    assert!(read_part(&exported.bytes, "[Content_Types].xml").contains(r#"Extension="png""#));
    assert!(session.check_integrity().is_valid);

    let operations: Vec<AuditOperation> = session
        .repository()
        .list_audit("p1")
        .unwrap()
        .iter()
        .map(|e| e.operation)
        .collect();
    assert_eq!(
        operations,
        vec![AuditOperation::Import, AuditOperation::ObjectAdd, AuditOperation::Export]
    );
}

#[test]
fn test_unreferenced_assets_are_not_exported() {
    let mut session = session();
    let asset = session.add_asset(PNG.to_vec(), "logo.png", "image/png").unwrap();

    // Nothing references the asset yet
    let exported = session.export().unwrap();
    assert!(exported.report.added_media.is_empty());
    assert_eq!(exported.bytes, fixture());

    // Inserted, then undone
    let object = DocumentObject::new(ObjectType::Logo, Some(asset.id));
    let object_id = object.id;
    session
        .dispatch(EditAction::InsertObject {
            object: Box::new(object.clone()),
        })
        .unwrap();
    session.undo().unwrap();
    let exported = session.export().unwrap();
    assert!(exported.report.added_media.is_empty());
    assert_eq!(exported.bytes, fixture());

    // Inserted, then deleted
    session.redo().unwrap();
    session.dispatch(EditAction::DeleteObject { object_id }).unwrap();
    let exported = session.export().unwrap();
    assert!(exported.report.added_media.is_empty());
    assert_eq!(
        read_part(&exported.bytes, "[Content_Types].xml"),
        read_part(&fixture(), "[Content_Types].xml")
    );
}

#[test]
fn test_imported_media_outside_word_media_is_not_rewritten() {
    let docx = DocxBuilder::new()
        .image_rel("rId5", "images/pic.png")
        .media_at("word/images/pic.png", PNG)
        .body(paragraph(&[run("Logo")]))
        .body(paragraph(&[anchored_picture("rId5", "Firmenlogo", 4_500_000, 300_000, 1_440_000, 720_000)]))
        .build();
    let repository = Arc::new(WorkspaceRepository::new(MemoryStorage::new()));
    let (mut session, warnings) =
        ProjectSession::import(repository, "p2", docx.clone(), None, &CanvasSettings::default()).unwrap();
    assert!(warnings.is_empty(), "{warnings:?}");
    assert_eq!(session.assets()[0].source_path.as_deref(), Some("word/images/pic.png"));

    let exported = session.export().unwrap();
    assert!(exported.report.is_unchanged());
    assert_eq!(exported.bytes, docx);

    let object_id = session.model().document_objects[0].id;
    session
        .dispatch(EditAction::MoveObject {
            object_id,
            x_px: 300.0,
            y_px: 40.0,
        })
        .unwrap();
    let moved = session.export().unwrap();
    assert_eq!(moved.report.patched_objects, 1);
    assert!(moved.report.added_media.is_empty());
}

#[tokio::test]
async fn test_rewrite_applies_as_one_step() {
    let mut session = session();
    let ids: Vec<_> = session.model().blocks.iter().map(|b| b.id()).collect();
    let mut answer = serde_json::Map::new();
    answer.insert(ids[0].to_string(), "Die {{FIRMA_NAME}} fertigt Bauteile.".into());
    answer.insert(ids[1].to_string(), "Absatz zwei".into());
    let answer = serde_json::Value::Object(answer).to_string();
    let service = ScriptedCompletionService::new().respond_with(answer);

    let outcome = session
        .rewrite(
            &RewriteEngine::default(),
            &service,
            RewriteRequest::new(RewriteScope::Document, Vec::new(), "formeller"),
        )
        .await
        .unwrap();
    assert_eq!(outcome.accepted_count(), 2);
    assert_eq!(session.model().blocks[0].text(), "Die {{FIRMA_NAME}} fertigt Bauteile.");

    // One undo reverts the whole rewrite
    session.undo().unwrap();
    assert_eq!(session.model().blocks[0].text(), "Die {{FIRMA_NAME}} liefert Teile.");
    assert_eq!(session.model().blocks[1].text(), "Zweiter Absatz");

    let audit = session.repository().list_audit("p1").unwrap();
    assert_eq!(audit.last().map(|e| e.operation), Some(AuditOperation::AiRewrite));
}

#[tokio::test]
async fn test_failed_rewrite_leaves_model_untouched() {
    let mut session = session();
    let before = session.model().clone();
    let service = ScriptedCompletionService::new().fail_with("backend down");

    let result = session
        .rewrite(
            &RewriteEngine::default(),
            &service,
            RewriteRequest::new(RewriteScope::Document, Vec::new(), "kürzer"),
        )
        .await;
    assert!(matches!(result, Err(StoreError::Rewrite(_))));
    assert_eq!(session.model(), &before);
    assert_eq!(session.repository().list_audit("p1").unwrap().len(), 1);
}

#[test]
fn test_save_and_restore_version() {
    let mut session = session();
    edit(&mut session, 1, "Stand A");
    let version = session.save_version("Stand A").unwrap();
    edit(&mut session, 1, "Stand B");

    session.restore_version(version.id).unwrap();
    assert_eq!(session.model().blocks[1].text(), "Stand A");
    // Restoring is not an undo step; history is untouched
    assert!(session.editor().can_undo());

    let stored = session.repository().get_version("p1", version.id).unwrap();
    let reimported = store::DocxImporter::default().import(&stored.binary, "p1", None).unwrap();
    assert_eq!(reimported.model.blocks[1].text(), "Stand A");

    assert!(matches!(
        session.restore_version(Uuid::new_v4()),
        Err(StoreError::VersionNotFound(_))
    ));
}

#[test]
fn test_version_pruning_keeps_newest() {
    let repository = WorkspaceRepository::new(MemoryStorage::new());
    repository
        .create_workspace("p1", DocumentModel::new(), Vec::new())
        .unwrap();

    let mut created = Vec::new();
    for i in 0..51 {
        let info = repository
            .create_version("p1", &format!("v{i}"), DocumentModel::new(), Vec::new(), "u")
            .unwrap();
        created.push(info.id);
    }

    let listed = repository.list_versions("p1").unwrap();
    assert_eq!(listed.len(), 50);
    assert_eq!(listed[0].id, created[50]);
    assert!(listed.iter().all(|v| v.id != created[0]));
    assert!(matches!(
        repository.get_version("p1", created[0]),
        Err(StoreError::VersionNotFound(_))
    ));
}

#[test]
fn test_file_storage_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let settings = CanvasSettings::default();

    let repository = Arc::new(WorkspaceRepository::new(FileStorage::new(temp_dir.path())));
    let (mut session, _) =
        ProjectSession::import(repository.clone(), "p1", fixture(), None, &settings).unwrap();
    edit(&mut session, 1, "gespeichert");
    drop(session);

    assert!(temp_dir.path().join("p1").join("workspace.json").exists());
    let reopened = ProjectSession::open(repository, "p1", &settings).unwrap();
    assert_eq!(reopened.model().blocks[1].text(), "gespeichert");
    assert!(!reopened.editor().can_undo());
}
