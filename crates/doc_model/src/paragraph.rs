//! Paragraph blocks

use crate::placeholder::extract_placeholders;
use crate::{DocModelError, NodeId, ParagraphStyle, PartKind, Result, Run};
use serde::{Deserialize, Serialize};

/// Address of a paragraph nested in a table cell, relative to its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellAddress {
    pub row: usize,
    pub cell: usize,
    /// Ordinal among the cell's `w:p` children
    pub paragraph: usize,
}

/// A paragraph and its runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphBlock {
    pub id: NodeId,
    /// Content part the paragraph lives in
    pub xml_path: String,
    /// Ordinal among the part's top-level `w:p` elements. For a cell
    /// paragraph this is the owning table's ordinal among `w:tbl` elements.
    pub node_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<CellAddress>,
    pub style: ParagraphStyle,
    pub runs: Vec<Run>,
    pub placeholders: Vec<String>,
    /// Optimistic-lock token, incremented on every text change
    pub local_version: u64,
}

impl ParagraphBlock {
    pub fn new(
        xml_path: impl Into<String>,
        node_index: usize,
        style: ParagraphStyle,
        runs: Vec<Run>,
    ) -> Self {
        let mut paragraph = Self {
            id: NodeId::new(),
            xml_path: xml_path.into(),
            node_index,
            cell: None,
            style,
            runs,
            placeholders: Vec::new(),
            local_version: 0,
        };
        paragraph.placeholders = extract_placeholders(&paragraph.text());
        paragraph
    }

    /// Concatenated text of all text runs
    pub fn text(&self) -> String {
        self.runs.iter().map(Run::text).collect()
    }

    pub fn char_len(&self) -> usize {
        self.runs.iter().map(|r| r.text().chars().count()).sum()
    }

    pub fn part_kind(&self) -> PartKind {
        PartKind::from_xml_path(&self.xml_path)
    }

    pub fn is_in_table(&self) -> bool {
        self.cell.is_some()
    }

    pub fn has_text_run(&self) -> bool {
        self.runs.iter().any(|r| r.as_text().is_some())
    }

    /// A paragraph is changed once it has received any text edit
    pub fn is_changed(&self) -> bool {
        self.local_version > 0
    }

    /// Replace the paragraph text.
    ///
    /// The whole text goes into the first text run and every other text run
    /// is emptied. The original run boundaries are reconstructed only at
    /// export time, against the source XML.
    pub fn set_text(&mut self, text: &str) -> Result<()> {
        if !self.has_text_run() {
            return Err(DocModelError::InvalidOperation(format!(
                "paragraph {} has no text run",
                self.id
            )));
        }

        let mut first = true;
        for run in self.runs.iter_mut().filter_map(Run::as_text_mut) {
            let slot = if first { text } else { "" };
            first = false;
            if run.text != slot {
                run.set_text(slot);
            }
        }

        self.placeholders = extract_placeholders(text);
        self.local_version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssetId, ImageRun, RunStyle, TextRun};

    fn paragraph(parts: &[&str]) -> ParagraphBlock {
        let runs = parts
            .iter()
            .map(|t| Run::Text(TextRun::new(*t, RunStyle::default())))
            .collect();
        ParagraphBlock::new("word/document.xml", 0, ParagraphStyle::default(), runs)
    }

    #[test]
    fn test_text_concatenates_runs() {
        let p = paragraph(&["Qualitäts", "handbuch ", "{{FIRMA_NAME}}"]);
        assert_eq!(p.text(), "Qualitätshandbuch {{FIRMA_NAME}}");
        assert_eq!(p.placeholders, vec!["{{FIRMA_NAME}}"]);
        assert_eq!(p.char_len(), 32);
    }

    #[test]
    fn test_set_text_fills_first_slot_and_empties_others() {
        let mut p = paragraph(&["Hello ", "big ", "world"]);
        p.set_text("Hi {{ORT}}").unwrap();

        let texts: Vec<&str> = p.runs.iter().map(Run::text).collect();
        assert_eq!(texts, vec!["Hi {{ORT}}", "", ""]);
        assert_eq!(p.local_version, 1);
        assert_eq!(p.placeholders, vec!["{{ORT}}"]);

        p.set_text("Again").unwrap();
        assert_eq!(p.local_version, 2);
    }

    #[test]
    fn test_set_text_skips_image_runs() {
        let mut p = paragraph(&["a"]);
        p.runs.insert(0, Run::Image(ImageRun::inline(AssetId::new(), 1, 1)));
        p.set_text("b").unwrap();
        assert_eq!(p.runs[1].text(), "b");
    }

    #[test]
    fn test_set_text_without_text_run_fails() {
        let mut p = paragraph(&[]);
        assert!(p.set_text("x").is_err());
        assert_eq!(p.local_version, 0);
    }
}
