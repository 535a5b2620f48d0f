//! Media extraction with content-hash deduplication

use crate::docx::content_types::ContentTypes;
use crate::docx::error::DocxResult;
use crate::docx::reader::DocxReader;
use doc_model::{Asset, AssetId};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::{Read, Seek};

/// Lower-case hex SHA-256
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Image formats found in DOCX media folders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
    Bmp,
    Tiff,
    Emf,
    Wmf,
    Svg,
    Unknown,
}

impl ImageFormat {
    /// Detect format from magic bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        // GIF: 47 49 46 38
        if data.starts_with(b"GIF8") {
            return Self::Gif;
        }

        // WebP: RIFF .... WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        // TIFF: II*\0 or MM\0*
        if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) {
            return Self::Tiff;
        }

        // EMF: record type 1 followed by " EMF" at offset 40
        if data.len() >= 44 && data.starts_with(&[0x01, 0x00, 0x00, 0x00]) && &data[40..44] == b" EMF" {
            return Self::Emf;
        }

        // Placeable WMF: D7 CD C6 9A
        if data.starts_with(&[0xD7, 0xCD, 0xC6, 0x9A]) {
            return Self::Wmf;
        }

        // BMP: 42 4D
        if data.starts_with(b"BM") {
            return Self::Bmp;
        }

        if let Ok(text) = std::str::from_utf8(&data[..data.len().min(256)]) {
            if text.to_lowercase().contains("<svg") {
                return Self::Svg;
            }
        }

        Self::Unknown
    }

    /// Get the MIME type for this format
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Emf => "image/x-emf",
            Self::Wmf => "image/x-wmf",
            Self::Svg => "image/svg+xml",
            Self::Unknown => "application/octet-stream",
        }
    }
}

/// Collects the media referenced by a document, one asset per distinct
/// content hash
pub struct AssetExtractor<'a> {
    project_id: String,
    content_types: &'a ContentTypes,
    assets: Vec<Asset>,
    by_hash: HashMap<String, AssetId>,
    by_path: HashMap<String, AssetId>,
}

impl<'a> AssetExtractor<'a> {
    pub fn new(project_id: impl Into<String>, content_types: &'a ContentTypes) -> Self {
        Self {
            project_id: project_id.into(),
            content_types,
            assets: Vec::new(),
            by_hash: HashMap::new(),
            by_path: HashMap::new(),
        }
    }

    /// Read a media entry and return the id of its asset. Identical binaries
    /// under different paths share one asset.
    pub fn extract<R: Read + Seek>(&mut self, reader: &mut DocxReader<R>, path: &str) -> DocxResult<AssetId> {
        if let Some(id) = self.by_path.get(path) {
            return Ok(*id);
        }

        let data = reader.read_file_as_bytes(path)?;
        let sha256 = sha256_hex(&data);
        if let Some(id) = self.by_hash.get(&sha256).copied() {
            self.by_path.insert(path.to_string(), id);
            return Ok(id);
        }

        let mime_type = self
            .content_types
            .get_content_type(path)
            .filter(|ct| ct.starts_with("image/"))
            .cloned()
            .unwrap_or_else(|| ImageFormat::from_bytes(&data).mime_type().to_string());
        let filename = path.rsplit('/').next().unwrap_or(path).to_string();

        let id = AssetId::new();
        self.assets.push(Asset {
            id,
            sha256: sha256.clone(),
            data,
            mime_type,
            filename,
            project_id: self.project_id.clone(),
            source_path: Some(path.to_string()),
        });
        self.by_hash.insert(sha256, id);
        self.by_path.insert(path.to_string(), id);
        Ok(id)
    }

    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn into_assets(self) -> Vec<Asset> {
        self.assets
    }
}
