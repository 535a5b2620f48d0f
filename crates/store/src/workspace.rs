//! Workspace, asset, version and audit persistence
//!
//! [`WorkspaceRepository`] owns the record-level rules (asset manifest,
//! version pruning, working-version pointer) and delegates raw JSON
//! persistence to a [`WorkspaceStorage`] backend. Asset binaries live in a
//! separate [`BlobStore`]; the asset collection only keeps their metadata.

use crate::docx::sha256_hex;
use crate::{Result, StoreError};
use chrono::{DateTime, Utc};
use doc_model::base64_bytes;
use doc_model::{Asset, AssetId, AuditEntry, AuditOperation, DocumentModel, Version, VersionInfo};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Versions kept per project
pub const DEFAULT_MAX_VERSIONS: usize = 50;

/// One persisted collection of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Workspace,
    Assets,
    Versions,
    Audit,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Workspace => "workspace",
            Collection::Assets => "assets",
            Collection::Versions => "versions",
            Collection::Audit => "audit",
        }
    }
}

/// Raw JSON persistence for project collections
pub trait WorkspaceStorage: Send + Sync {
    /// Read a collection, `None` when it was never written
    fn read(&self, project_id: &str, collection: Collection) -> Result<Option<String>>;

    fn write(&self, project_id: &str, collection: Collection, json: &str) -> Result<()>;
}

/// In-memory storage for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStorage {
    collections: RwLock<HashMap<(String, Collection), String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkspaceStorage for MemoryStorage {
    fn read(&self, project_id: &str, collection: Collection) -> Result<Option<String>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Backend("memory storage lock poisoned".into()))?;
        Ok(collections.get(&(project_id.to_string(), collection)).cloned())
    }

    fn write(&self, project_id: &str, collection: Collection, json: &str) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Backend("memory storage lock poisoned".into()))?;
        collections.insert((project_id.to_string(), collection), json.to_string());
        Ok(())
    }
}

/// One JSON file per collection under `root/<project>/`
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn path(&self, project_id: &str, collection: Collection) -> Result<PathBuf> {
        // Project ids become directory names
        if project_id.is_empty()
            || project_id
                .chars()
                .any(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        {
            return Err(StoreError::Backend(format!("invalid project id: {project_id:?}")));
        }
        Ok(self
            .root
            .join(project_id)
            .join(format!("{}.json", collection.as_str())))
    }
}

impl WorkspaceStorage for FileStorage {
    fn read(&self, project_id: &str, collection: Collection) -> Result<Option<String>> {
        let path = self.path(project_id, collection)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn write(&self, project_id: &str, collection: Collection, json: &str) -> Result<()> {
        let path = self.path(project_id, collection)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crash never leaves a truncated collection
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Binary storage for asset data, keyed by asset id
pub trait BlobStore: Send + Sync {
    fn put(&self, id: AssetId, data: Vec<u8>) -> Result<()>;

    fn get(&self, id: AssetId) -> Result<Option<Vec<u8>>>;
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<AssetId, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, id: AssetId, data: Vec<u8>) -> Result<()> {
        self.blobs
            .write()
            .map_err(|_| StoreError::Backend("blob store lock poisoned".into()))?
            .insert(id, data);
        Ok(())
    }

    fn get(&self, id: AssetId) -> Result<Option<Vec<u8>>> {
        Ok(self
            .blobs
            .read()
            .map_err(|_| StoreError::Backend("blob store lock poisoned".into()))?
            .get(&id)
            .cloned())
    }
}

/// One file per asset under `root/`
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, id: AssetId) -> PathBuf {
        self.root.join(id.to_string())
    }
}

impl BlobStore for FileBlobStore {
    fn put(&self, id: AssetId, data: Vec<u8>) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.path(id), data)?;
        Ok(())
    }

    fn get(&self, id: AssetId) -> Result<Option<Vec<u8>>> {
        let path = self.path(id);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read(path)?))
    }
}

/// The editable state of one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub project_id: String,
    pub model: DocumentModel,
    /// The imported DOCX; every export patches this binary
    #[serde(with = "base64_bytes")]
    pub source_binary: Vec<u8>,
    #[serde(default)]
    pub working_version: Option<Uuid>,
    #[serde(default)]
    pub asset_ids: Vec<AssetId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(project_id: impl Into<String>, model: DocumentModel, source_binary: Vec<u8>) -> Self {
        let now = Utc::now();
        Self {
            project_id: project_id.into(),
            model,
            source_binary,
            working_version: None,
            asset_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Record-level access to workspaces, assets, versions and audit entries
pub struct WorkspaceRepository<S: WorkspaceStorage, B: BlobStore = MemoryBlobStore> {
    storage: S,
    blobs: B,
    max_versions: usize,
}

impl<S: WorkspaceStorage> WorkspaceRepository<S, MemoryBlobStore> {
    pub fn new(storage: S) -> Self {
        Self::with_blob_store(storage, MemoryBlobStore::new())
    }
}

impl<S: WorkspaceStorage, B: BlobStore> WorkspaceRepository<S, B> {
    pub fn with_blob_store(storage: S, blobs: B) -> Self {
        Self {
            storage,
            blobs,
            max_versions: DEFAULT_MAX_VERSIONS,
        }
    }

    pub fn with_max_versions(mut self, max_versions: usize) -> Self {
        self.max_versions = max_versions.max(1);
        self
    }

    pub fn max_versions(&self) -> usize {
        self.max_versions
    }

    fn load<T: DeserializeOwned>(&self, project_id: &str, collection: Collection) -> Result<Option<T>> {
        match self.storage.read(project_id, collection)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn load_list<T: DeserializeOwned>(&self, project_id: &str, collection: Collection) -> Result<Vec<T>> {
        Ok(self.load(project_id, collection)?.unwrap_or_default())
    }

    fn save<T: Serialize + ?Sized>(&self, project_id: &str, collection: Collection, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.storage.write(project_id, collection, &json)
    }

    // Workspaces

    pub fn create_workspace(
        &self,
        project_id: &str,
        model: DocumentModel,
        source_binary: Vec<u8>,
    ) -> Result<Workspace> {
        let workspace = Workspace::new(project_id, model, source_binary);
        self.save(project_id, Collection::Workspace, &workspace)?;
        info!("Created workspace for project {}", project_id);
        Ok(workspace)
    }

    pub fn get_workspace(&self, project_id: &str) -> Result<Workspace> {
        self.load(project_id, Collection::Workspace)?
            .ok_or_else(|| StoreError::WorkspaceNotFound(project_id.to_string()))
    }

    /// Replace the stored model of an existing workspace
    pub fn update_workspace(&self, project_id: &str, model: &DocumentModel) -> Result<Workspace> {
        let mut workspace = self.get_workspace(project_id)?;
        workspace.model = model.clone();
        workspace.updated_at = Utc::now();
        self.save(project_id, Collection::Workspace, &workspace)?;
        debug!("Updated workspace for project {}", project_id);
        Ok(workspace)
    }

    // Assets

    /// Store an asset and list it in the workspace manifest. An asset with
    /// the same content hash is reused instead of stored twice.
    pub fn add_asset(&self, asset: Asset) -> Result<Asset> {
        let project_id = asset.project_id.clone();
        let mut records: Vec<Asset> = self.load_list(&project_id, Collection::Assets)?;

        let sha256 = if asset.sha256.is_empty() {
            sha256_hex(&asset.data)
        } else {
            asset.sha256.clone()
        };
        if let Some(existing) = records.iter().find(|a| a.sha256 == sha256) {
            debug!("Asset {} deduplicated as {}", asset.filename, existing.id);
            return self.get_asset(&project_id, existing.id);
        }

        let mut record = Asset {
            sha256,
            data: Vec::new(),
            ..asset
        };
        self.blobs.put(record.id, asset.data)?;
        records.push(record.clone());
        self.save(&project_id, Collection::Assets, &records)?;

        if let Some(mut workspace) = self.load::<Workspace>(&project_id, Collection::Workspace)? {
            if !workspace.asset_ids.contains(&record.id) {
                workspace.asset_ids.push(record.id);
                workspace.updated_at = Utc::now();
                self.save(&project_id, Collection::Workspace, &workspace)?;
            }
        }

        record.data = self.blobs.get(record.id)?.unwrap_or_default();
        Ok(record)
    }

    pub fn get_asset(&self, project_id: &str, id: AssetId) -> Result<Asset> {
        let records: Vec<Asset> = self.load_list(project_id, Collection::Assets)?;
        let mut asset = records
            .into_iter()
            .find(|a| a.id == id)
            .ok_or(StoreError::AssetNotFound(id))?;
        asset.data = self.blobs.get(id)?.ok_or(StoreError::AssetNotFound(id))?;
        Ok(asset)
    }

    /// Asset metadata of a project; `data` is left empty
    pub fn list_assets(&self, project_id: &str) -> Result<Vec<Asset>> {
        self.load_list(project_id, Collection::Assets)
    }

    // Versions

    /// Snapshot a model and binary. The new version becomes the working
    /// version; the oldest versions beyond the limit are pruned.
    pub fn create_version(
        &self,
        project_id: &str,
        name: &str,
        model: DocumentModel,
        binary: Vec<u8>,
        created_by: &str,
    ) -> Result<VersionInfo> {
        let mut workspace = self.get_workspace(project_id)?;
        let mut versions: Vec<Version> = self.load_list(project_id, Collection::Versions)?;

        let version = Version::new(project_id, name, model, binary, created_by);
        let info = VersionInfo::from(&version);
        versions.push(version);

        // Stable: versions created within the same instant keep insertion order
        versions.sort_by_key(|v| v.created_at);
        if versions.len() > self.max_versions {
            let excess = versions.len() - self.max_versions;
            versions.drain(..excess);
            debug!("Pruned {} old versions of project {}", excess, project_id);
        }
        self.save(project_id, Collection::Versions, &versions)?;

        workspace.working_version = Some(info.id);
        workspace.updated_at = Utc::now();
        self.save(project_id, Collection::Workspace, &workspace)?;

        info!("Created version '{}' of project {}", name, project_id);
        Ok(info)
    }

    pub fn get_version(&self, project_id: &str, version_id: Uuid) -> Result<Version> {
        self.load_list::<Version>(project_id, Collection::Versions)?
            .into_iter()
            .find(|v| v.id == version_id)
            .ok_or(StoreError::VersionNotFound(version_id))
    }

    /// Versions of a project, newest first
    pub fn list_versions(&self, project_id: &str) -> Result<Vec<VersionInfo>> {
        let versions: Vec<Version> = self.load_list(project_id, Collection::Versions)?;
        Ok(versions.iter().rev().map(VersionInfo::from).collect())
    }

    /// Make a version's model the live workspace model and audit the restore
    pub fn restore_version(&self, project_id: &str, version_id: Uuid, actor: &str) -> Result<Workspace> {
        let version = self.get_version(project_id, version_id)?;
        let mut workspace = self.get_workspace(project_id)?;
        workspace.model = version.model;
        workspace.working_version = Some(version_id);
        workspace.updated_at = Utc::now();
        self.save(project_id, Collection::Workspace, &workspace)?;

        self.append_audit(
            AuditEntry::new(project_id, AuditOperation::VersionRestore, actor)
                .with_scope(version_id.to_string()),
        )?;
        info!("Restored version {} of project {}", version_id, project_id);
        Ok(workspace)
    }

    // Audit

    pub fn append_audit(&self, entry: AuditEntry) -> Result<()> {
        let mut entries: Vec<AuditEntry> = self.load_list(&entry.project_id, Collection::Audit)?;
        let project_id = entry.project_id.clone();
        entries.push(entry);
        self.save(&project_id, Collection::Audit, &entries)
    }

    /// Audit entries in the order they were appended
    pub fn list_audit(&self, project_id: &str) -> Result<Vec<AuditEntry>> {
        self.load_list(project_id, Collection::Audit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository() -> WorkspaceRepository<MemoryStorage> {
        let repo = WorkspaceRepository::new(MemoryStorage::new());
        repo.create_workspace("p1", DocumentModel::new(), b"docx".to_vec())
            .unwrap();
        repo
    }

    fn asset(data: &[u8]) -> Asset {
        Asset {
            id: AssetId::new(),
            sha256: String::new(),
            data: data.to_vec(),
            mime_type: "image/png".into(),
            filename: "logo.png".into(),
            project_id: "p1".into(),
            source_path: None,
        }
    }

    #[test]
    fn test_missing_workspace() {
        let repo = WorkspaceRepository::new(MemoryStorage::new());
        assert!(matches!(
            repo.get_workspace("nope"),
            Err(StoreError::WorkspaceNotFound(_))
        ));
    }

    #[test]
    fn test_assets_update_manifest_and_dedup() {
        let repo = repository();
        let first = repo.add_asset(asset(b"png-bytes")).unwrap();
        let second = repo.add_asset(asset(b"png-bytes")).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.data, b"png-bytes");

        let workspace = repo.get_workspace("p1").unwrap();
        assert_eq!(workspace.asset_ids, vec![first.id]);
        assert_eq!(repo.list_assets("p1").unwrap().len(), 1);
        assert!(repo.list_assets("p1").unwrap()[0].data.is_empty());
        assert!(matches!(
            repo.get_asset("p1", AssetId::new()),
            Err(StoreError::AssetNotFound(_))
        ));
    }

    #[test]
    fn test_version_pointer_and_listing() {
        let repo = repository();
        let v1 = repo
            .create_version("p1", "first", DocumentModel::new(), Vec::new(), "u")
            .unwrap();
        let v2 = repo
            .create_version("p1", "second", DocumentModel::new(), Vec::new(), "u")
            .unwrap();
        assert_eq!(repo.get_workspace("p1").unwrap().working_version, Some(v2.id));

        let listed = repo.list_versions("p1").unwrap();
        assert_eq!(listed.iter().map(|v| v.id).collect::<Vec<_>>(), vec![v2.id, v1.id]);
    }

    #[test]
    fn test_restore_records_audit() {
        let repo = repository();
        let mut model = DocumentModel::new();
        model.metadata.page_count = 7;
        let v = repo
            .create_version("p1", "snap", model, Vec::new(), "u")
            .unwrap();
        repo.update_workspace("p1", &DocumentModel::new()).unwrap();

        let restored = repo.restore_version("p1", v.id, "u").unwrap();
        assert_eq!(restored.model.metadata.page_count, 7);

        let audit = repo.list_audit("p1").unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].operation, AuditOperation::VersionRestore);
        assert!(audit[0].changes.is_empty());

        assert!(matches!(
            repo.restore_version("p1", Uuid::new_v4(), "u"),
            Err(StoreError::VersionNotFound(_))
        ));
    }

    #[test]
    fn test_file_backends() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let repo = WorkspaceRepository::with_blob_store(
            FileStorage::new(temp_dir.path()),
            FileBlobStore::new(temp_dir.path().join("blobs")),
        );
        repo.create_workspace("p1", DocumentModel::new(), Vec::new())
            .unwrap();
        let stored = repo.add_asset(asset(b"stamp")).unwrap();

        let reopened = WorkspaceRepository::with_blob_store(
            FileStorage::new(temp_dir.path()),
            FileBlobStore::new(temp_dir.path().join("blobs")),
        );
        assert_eq!(reopened.get_asset("p1", stored.id).unwrap().data, b"stamp");
        assert_eq!(reopened.get_workspace("p1").unwrap().asset_ids, vec![stored.id]);
    }

    #[test]
    fn test_file_storage_rejects_path_like_ids() {
        let storage = FileStorage::new("/tmp/unused");
        assert!(storage.read("../etc", Collection::Workspace).is_err());
    }
}
