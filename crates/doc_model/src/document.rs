//! The document model root: blocks, estimated pages and floating objects

use crate::placeholder::extract_tokens;
use crate::units::twips_to_px;
use crate::{
    AnchorRef, Block, DocModelError, DocumentObject, NodeId, ObjectType, ParagraphBlock,
    PartKind, Result, StyleCatalogue,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Page size and margins, in twips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageGeometry {
    pub width_twips: i64,
    pub height_twips: i64,
    pub margin_top_twips: i64,
    pub margin_bottom_twips: i64,
    pub margin_left_twips: i64,
    pub margin_right_twips: i64,
    pub header_twips: i64,
    pub footer_twips: i64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        // A4 portrait, 2.5 cm margins
        Self {
            width_twips: 11906,
            height_twips: 16838,
            margin_top_twips: 1417,
            margin_bottom_twips: 1134,
            margin_left_twips: 1417,
            margin_right_twips: 1417,
            header_twips: 708,
            footer_twips: 708,
        }
    }
}

impl PageGeometry {
    pub fn width_px(&self) -> f64 {
        twips_to_px(self.width_twips)
    }

    pub fn height_px(&self) -> f64 {
        twips_to_px(self.height_twips)
    }

    /// Height available to body content
    pub fn content_height_px(&self) -> f64 {
        twips_to_px(self.height_twips - self.margin_top_twips - self.margin_bottom_twips)
    }

    /// Width available to body content
    pub fn content_width_px(&self) -> f64 {
        twips_to_px(self.width_twips - self.margin_left_twips - self.margin_right_twips)
    }
}

/// Where a body block was estimated to start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePlacement {
    pub block_id: NodeId,
    pub y_px: f64,
    pub height_px: f64,
}

/// An estimated page. Pages reference blocks, they never own them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub number: u32,
    pub geometry: PageGeometry,
    pub placements: Vec<PagePlacement>,
}

impl Page {
    pub fn new(number: u32, geometry: PageGeometry) -> Self {
        Self {
            number,
            geometry,
            placements: Vec::new(),
        }
    }
}

/// Document-level summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub page_count: u32,
    pub has_headers: bool,
    pub has_footers: bool,
    pub has_images: bool,
    pub has_signatures: bool,
    pub has_logos: bool,
    /// SHA-256 hex of the imported binary
    pub preview_version: String,
    /// Sorted unique placeholder tokens
    pub placeholders: Vec<String>,
    #[serde(default)]
    pub source_filename: Option<String>,
}

/// The editable document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentModel {
    pub blocks: Vec<Block>,
    pub pages: Vec<Page>,
    pub document_objects: Vec<DocumentObject>,
    pub styles: StyleCatalogue,
    pub metadata: DocumentMetadata,
    /// Imported anchors deleted in the editor
    #[serde(default)]
    pub removed_anchors: Vec<AnchorRef>,
}

impl DocumentModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every paragraph in the model, including table cell paragraphs, in
    /// block order
    pub fn paragraphs(&self) -> impl Iterator<Item = &ParagraphBlock> {
        self.blocks.iter().flat_map(Block::paragraphs)
    }

    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut ParagraphBlock> {
        self.blocks.iter_mut().flat_map(Block::paragraphs_mut)
    }

    pub fn block(&self, id: NodeId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    pub fn find_paragraph(&self, id: NodeId) -> Option<&ParagraphBlock> {
        self.paragraphs().find(|p| p.id == id)
    }

    pub fn find_paragraph_mut(&mut self, id: NodeId) -> Option<&mut ParagraphBlock> {
        self.paragraphs_mut().find(|p| p.id == id)
    }

    /// Replace a paragraph's text in place
    pub fn set_paragraph_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        let paragraph = self
            .find_paragraph_mut(id)
            .ok_or(DocModelError::BlockNotFound(id))?;
        paragraph.set_text(text)?;
        self.refresh_placeholders();
        Ok(())
    }

    /// Ids of paragraphs that received at least one text edit
    pub fn changed_block_ids(&self) -> Vec<NodeId> {
        self.paragraphs()
            .filter(|p| p.is_changed())
            .map(|p| p.id)
            .collect()
    }

    pub fn object(&self, id: NodeId) -> Option<&DocumentObject> {
        self.document_objects.iter().find(|o| o.id == id)
    }

    pub fn object_mut(&mut self, id: NodeId) -> Result<&mut DocumentObject> {
        self.document_objects
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(DocModelError::ObjectNotFound(id))
    }

    /// Remove an object, leaving a tombstone when it came from the source
    pub fn remove_object(&mut self, id: NodeId) -> Result<DocumentObject> {
        let pos = self
            .document_objects
            .iter()
            .position(|o| o.id == id)
            .ok_or(DocModelError::ObjectNotFound(id))?;
        let object = self.document_objects.remove(pos);
        if let Some(source) = &object.source {
            self.removed_anchors.push(source.clone());
        }
        self.refresh_object_flags();
        Ok(object)
    }

    pub fn insert_object(&mut self, object: DocumentObject) {
        self.document_objects.push(object);
        self.refresh_object_flags();
    }

    /// Signature and stamp objects
    pub fn signature_objects(&self) -> impl Iterator<Item = &DocumentObject> {
        self.document_objects
            .iter()
            .filter(|o| o.is_signature_or_stamp())
    }

    /// Page a body block was estimated to start on
    pub fn page_of_block(&self, id: NodeId) -> Option<&Page> {
        self.pages
            .iter()
            .find(|page| page.placements.iter().any(|p| p.block_id == id))
    }

    /// Block containing the given paragraph (itself or its table)
    pub fn block_of_paragraph(&self, id: NodeId) -> Option<&Block> {
        self.blocks
            .iter()
            .find(|b| b.paragraphs().any(|p| p.id == id))
    }

    pub fn page_geometry(&self) -> PageGeometry {
        self.pages
            .first()
            .map(|p| p.geometry)
            .unwrap_or_default()
    }

    /// Sorted unique placeholder tokens across all paragraphs
    pub fn placeholder_tokens(&self) -> Vec<String> {
        self.paragraphs()
            .flat_map(|p| extract_tokens(&p.text()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn refresh_placeholders(&mut self) {
        self.metadata.placeholders = self.placeholder_tokens();
    }

    pub fn refresh_object_flags(&mut self) {
        let has = |t: ObjectType| self.document_objects.iter().any(|o| o.object_type == t);
        let has_signatures = has(ObjectType::Signature) || has(ObjectType::Stamp);
        let has_logos = has(ObjectType::Logo);
        let has_inline = self
            .paragraphs()
            .any(|p| p.runs.iter().any(|r| r.as_text().is_none()));
        self.metadata.has_signatures = has_signatures;
        self.metadata.has_logos = has_logos;
        self.metadata.has_images = has_inline || !self.document_objects.is_empty();
    }

    pub fn has_part(&self, kind: PartKind) -> bool {
        self.blocks.iter().any(|b| b.part_kind() == kind)
    }
}
