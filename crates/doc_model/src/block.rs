//! Blocks: the top-level content units of a part

use crate::{NodeId, ParagraphBlock, PartKind, TableBlock};
use serde::{Deserialize, Serialize};

/// A top-level element of a content part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    Paragraph(ParagraphBlock),
    Table(TableBlock),
}

impl Block {
    pub fn id(&self) -> NodeId {
        match self {
            Block::Paragraph(p) => p.id,
            Block::Table(t) => t.id,
        }
    }

    pub fn xml_path(&self) -> &str {
        match self {
            Block::Paragraph(p) => &p.xml_path,
            Block::Table(t) => &t.xml_path,
        }
    }

    pub fn node_index(&self) -> usize {
        match self {
            Block::Paragraph(p) => p.node_index,
            Block::Table(t) => t.node_index,
        }
    }

    pub fn part_kind(&self) -> PartKind {
        PartKind::from_xml_path(self.xml_path())
    }

    /// Every paragraph of the block: itself, or the table's cell paragraphs
    pub fn paragraphs(&self) -> Box<dyn Iterator<Item = &ParagraphBlock> + '_> {
        match self {
            Block::Paragraph(p) => Box::new(std::iter::once(p)),
            Block::Table(t) => Box::new(t.paragraphs()),
        }
    }

    pub fn paragraphs_mut(&mut self) -> Box<dyn Iterator<Item = &mut ParagraphBlock> + '_> {
        match self {
            Block::Paragraph(p) => Box::new(std::iter::once(p)),
            Block::Table(t) => Box::new(t.paragraphs_mut()),
        }
    }

    pub fn text(&self) -> String {
        match self {
            Block::Paragraph(p) => p.text(),
            Block::Table(t) => t.text(),
        }
    }
}
