//! Runs: the ordered content of a paragraph

use crate::placeholder::extract_placeholders;
use crate::{AnchorType, AssetId, EmuPoint, NodeId, RunStyle, WrapMode};
use serde::{Deserialize, Serialize};

/// A run of text with one flat style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    pub id: NodeId,
    pub text: String,
    pub style: RunStyle,
    pub placeholders: Vec<String>,
    pub local_version: u64,
}

impl TextRun {
    pub fn new(text: impl Into<String>, style: RunStyle) -> Self {
        let text = text.into();
        Self {
            id: NodeId::new(),
            placeholders: extract_placeholders(&text),
            text,
            style,
            local_version: 0,
        }
    }

    /// Replace the text, recomputing placeholders and bumping the version
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.placeholders = extract_placeholders(&self.text);
        self.local_version += 1;
    }

    /// Number of characters (not bytes)
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// An inline image inside the text flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRun {
    pub id: NodeId,
    pub asset_id: AssetId,
    pub width_emu: i64,
    pub height_emu: i64,
    pub anchor: AnchorType,
    pub wrap: WrapMode,
    pub position_emu: Option<EmuPoint>,
    pub z_order: i64,
}

impl ImageRun {
    pub fn inline(asset_id: AssetId, width_emu: i64, height_emu: i64) -> Self {
        Self {
            id: NodeId::new(),
            asset_id,
            width_emu,
            height_emu,
            anchor: AnchorType::Inline,
            wrap: WrapMode::Inline,
            position_emu: None,
            z_order: 0,
        }
    }
}

/// A run inside a paragraph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Run {
    Text(TextRun),
    Image(ImageRun),
}

impl Run {
    pub fn id(&self) -> NodeId {
        match self {
            Run::Text(run) => run.id,
            Run::Image(run) => run.id,
        }
    }

    pub fn as_text(&self) -> Option<&TextRun> {
        match self {
            Run::Text(run) => Some(run),
            Run::Image(_) => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextRun> {
        match self {
            Run::Text(run) => Some(run),
            Run::Image(_) => None,
        }
    }

    /// Text contributed by this run; images contribute nothing
    pub fn text(&self) -> &str {
        match self {
            Run::Text(run) => &run.text,
            Run::Image(_) => "",
        }
    }
}
