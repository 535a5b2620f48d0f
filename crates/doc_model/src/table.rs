//! Table blocks
//!
//! Only the cell content is modelled. Table-level formatting is kept as the
//! verbatim `w:tblPr` fragment and replayed untouched.

use crate::{NodeId, ParagraphBlock};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    pub paragraphs: Vec<ParagraphBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableBlock {
    pub id: NodeId,
    pub xml_path: String,
    /// Ordinal among the part's top-level `w:tbl` elements
    pub node_index: usize,
    pub rows: Vec<TableRow>,
    /// Verbatim `w:tblPr` XML
    #[serde(default)]
    pub properties_xml: String,
}

impl TableBlock {
    pub fn new(xml_path: impl Into<String>, node_index: usize) -> Self {
        Self {
            id: NodeId::new(),
            xml_path: xml_path.into(),
            node_index,
            rows: Vec::new(),
            properties_xml: String::new(),
        }
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &ParagraphBlock> {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .flat_map(|cell| cell.paragraphs.iter())
    }

    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut ParagraphBlock> {
        self.rows
            .iter_mut()
            .flat_map(|row| row.cells.iter_mut())
            .flat_map(|cell| cell.paragraphs.iter_mut())
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }

    /// Concatenated text of the table, cells separated by tabs, rows by newlines
    pub fn text(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                row.cells
                    .iter()
                    .map(|cell| {
                        cell.paragraphs
                            .iter()
                            .map(ParagraphBlock::text)
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
