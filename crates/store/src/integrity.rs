//! Model integrity checking
//!
//! Validates the invariants the exporter relies on: unique ids, contiguous
//! per-part node indices, placeholders that match the text and asset
//! references that resolve.

use crate::docx::sha256_hex;
use doc_model::placeholder::extract_placeholders;
use doc_model::{Asset, AssetId, Block, DocumentModel, NodeId, Run};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Integrity check result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    /// No issue above warning level
    pub is_valid: bool,
    /// SHA-256 of the serialized model
    pub checksum: String,
    pub issues: Vec<IntegrityIssue>,
    pub stats: DocumentStats,
}

impl IntegrityReport {
    pub fn worst_severity(&self) -> Option<IssueSeverity> {
        self.issues.iter().map(IntegrityIssue::severity).max()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IntegrityIssue {
    /// The same id is used by two blocks, runs or objects
    #[serde(rename_all = "camelCase")]
    DuplicateId { id: NodeId },
    /// Node indices of one kind in one part are not `0..K-1` in order
    #[serde(rename_all = "camelCase")]
    NodeIndexGap {
        xml_path: String,
        kind: String,
        expected: usize,
        found: usize,
    },
    /// Derived placeholders disagree with the paragraph text
    #[serde(rename_all = "camelCase")]
    StalePlaceholders { block_id: NodeId },
    /// Document-level placeholder set disagrees with the paragraphs
    StaleDocumentPlaceholders,
    /// An object or inline image references an unknown asset
    #[serde(rename_all = "camelCase")]
    UnknownAsset { owner_id: NodeId, asset_id: AssetId },
    /// The model has no content at all
    EmptyDocument,
    /// The binary does not hash to the model's preview version
    #[serde(rename_all = "camelCase")]
    ChecksumMismatch { expected: String, actual: String },
}

impl IntegrityIssue {
    pub fn severity(&self) -> IssueSeverity {
        match self {
            IntegrityIssue::DuplicateId { .. } => IssueSeverity::Critical,
            IntegrityIssue::NodeIndexGap { .. } => IssueSeverity::Critical,
            IntegrityIssue::StalePlaceholders { .. } => IssueSeverity::Warning,
            IntegrityIssue::StaleDocumentPlaceholders => IssueSeverity::Warning,
            IntegrityIssue::UnknownAsset { .. } => IssueSeverity::Error,
            IntegrityIssue::EmptyDocument => IssueSeverity::Warning,
            IntegrityIssue::ChecksumMismatch { .. } => IssueSeverity::Error,
        }
    }
}

/// Severity levels for integrity issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IssueSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Document statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub paragraph_count: usize,
    pub table_count: usize,
    pub run_count: usize,
    pub image_count: usize,
    pub object_count: usize,
    pub placeholder_count: usize,
    /// Approximate word count
    pub word_count: usize,
    pub character_count: usize,
}

/// Integrity checker for document models
#[derive(Debug, Clone, Default)]
pub struct IntegrityChecker;

impl IntegrityChecker {
    pub fn new() -> Self {
        Self
    }

    /// Check a model against the assets it may reference
    pub fn check(&self, model: &DocumentModel, assets: &[Asset]) -> IntegrityReport {
        let mut issues = Vec::new();

        if model.blocks.is_empty() && model.document_objects.is_empty() {
            issues.push(IntegrityIssue::EmptyDocument);
        }
        self.check_ids(model, &mut issues);
        self.check_node_indices(model, &mut issues);
        self.check_placeholders(model, &mut issues);
        self.check_assets(model, assets, &mut issues);

        let checksum = serde_json::to_vec(model)
            .map(|bytes| sha256_hex(&bytes))
            .unwrap_or_default();

        IntegrityReport {
            is_valid: issues
                .iter()
                .all(|i| i.severity() <= IssueSeverity::Warning),
            checksum,
            issues,
            stats: self.compute_stats(model),
        }
    }

    /// Check that `binary` is the source the model was imported from
    pub fn check_source(&self, model: &DocumentModel, binary: &[u8]) -> Option<IntegrityIssue> {
        let actual = sha256_hex(binary);
        (actual != model.metadata.preview_version).then(|| IntegrityIssue::ChecksumMismatch {
            expected: model.metadata.preview_version.clone(),
            actual,
        })
    }

    fn check_ids(&self, model: &DocumentModel, issues: &mut Vec<IntegrityIssue>) {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut visit = |id: NodeId, issues: &mut Vec<IntegrityIssue>| {
            if !seen.insert(id) && reported.insert(id) {
                issues.push(IntegrityIssue::DuplicateId { id });
            }
        };

        for block in &model.blocks {
            if let Block::Table(table) = block {
                visit(table.id, issues);
            }
            for paragraph in block.paragraphs() {
                visit(paragraph.id, issues);
                for run in &paragraph.runs {
                    visit(run.id(), issues);
                }
            }
        }
        for object in &model.document_objects {
            visit(object.id, issues);
        }
    }

    fn check_node_indices(&self, model: &DocumentModel, issues: &mut Vec<IntegrityIssue>) {
        let mut next: BTreeMap<(&str, &str), usize> = BTreeMap::new();
        for block in &model.blocks {
            let kind = match block {
                Block::Paragraph(_) => "paragraph",
                Block::Table(_) => "table",
            };
            let expected = next.entry((block.xml_path(), kind)).or_insert(0);
            if block.node_index() != *expected {
                issues.push(IntegrityIssue::NodeIndexGap {
                    xml_path: block.xml_path().to_string(),
                    kind: kind.to_string(),
                    expected: *expected,
                    found: block.node_index(),
                });
            }
            *expected = block.node_index() + 1;

            if let Block::Table(table) = block {
                for paragraph in table.paragraphs() {
                    if paragraph.node_index != table.node_index {
                        issues.push(IntegrityIssue::NodeIndexGap {
                            xml_path: table.xml_path.clone(),
                            kind: "cell paragraph".to_string(),
                            expected: table.node_index,
                            found: paragraph.node_index,
                        });
                    }
                }
            }
        }
    }

    fn check_placeholders(&self, model: &DocumentModel, issues: &mut Vec<IntegrityIssue>) {
        for paragraph in model.paragraphs() {
            if paragraph.placeholders != extract_placeholders(&paragraph.text()) {
                issues.push(IntegrityIssue::StalePlaceholders {
                    block_id: paragraph.id,
                });
            }
        }
        if model.metadata.placeholders != model.placeholder_tokens() {
            issues.push(IntegrityIssue::StaleDocumentPlaceholders);
        }
    }

    fn check_assets(&self, model: &DocumentModel, assets: &[Asset], issues: &mut Vec<IntegrityIssue>) {
        let known: HashSet<AssetId> = assets.iter().map(|a| a.id).collect();
        for paragraph in model.paragraphs() {
            for run in &paragraph.runs {
                if let Run::Image(image) = run {
                    if !known.contains(&image.asset_id) {
                        issues.push(IntegrityIssue::UnknownAsset {
                            owner_id: image.id,
                            asset_id: image.asset_id,
                        });
                    }
                }
            }
        }
        for object in &model.document_objects {
            if let Some(asset_id) = object.asset_id.filter(|id| !known.contains(id)) {
                issues.push(IntegrityIssue::UnknownAsset {
                    owner_id: object.id,
                    asset_id,
                });
            }
        }
    }

    fn compute_stats(&self, model: &DocumentModel) -> DocumentStats {
        let mut stats = DocumentStats {
            table_count: model
                .blocks
                .iter()
                .filter(|b| matches!(b, Block::Table(_)))
                .count(),
            object_count: model.document_objects.len(),
            placeholder_count: model.metadata.placeholders.len(),
            ..Default::default()
        };
        for paragraph in model.paragraphs() {
            stats.paragraph_count += 1;
            for run in &paragraph.runs {
                match run {
                    Run::Text(text) => {
                        stats.run_count += 1;
                        stats.character_count += text.char_len();
                        stats.word_count += text.text.split_whitespace().count();
                    }
                    Run::Image(_) => stats.image_count += 1,
                }
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{ImageRun, ParagraphBlock, ParagraphStyle, RunStyle, TextRun, MAIN_DOCUMENT_PART};

    fn paragraph(index: usize, text: &str) -> Block {
        Block::Paragraph(ParagraphBlock::new(
            MAIN_DOCUMENT_PART,
            index,
            ParagraphStyle::default(),
            vec![Run::Text(TextRun::new(text, RunStyle::default()))],
        ))
    }

    fn model(blocks: Vec<Block>) -> DocumentModel {
        let mut model = DocumentModel::new();
        model.blocks = blocks;
        model.refresh_placeholders();
        model
    }

    #[test]
    fn test_valid_model() {
        let report = IntegrityChecker::new().check(&model(vec![paragraph(0, "a {{X}}"), paragraph(1, "b")]), &[]);
        assert!(report.is_valid, "{:?}", report.issues);
        assert!(report.issues.is_empty());
        assert_eq!(report.stats.paragraph_count, 2);
        assert_eq!(report.stats.placeholder_count, 1);
        assert_eq!(report.checksum.len(), 64);
    }

    #[test]
    fn test_node_index_gap() {
        let report = IntegrityChecker::new().check(&model(vec![paragraph(0, "a"), paragraph(2, "b")]), &[]);
        assert!(!report.is_valid);
        assert!(matches!(
            report.issues[0],
            IntegrityIssue::NodeIndexGap { expected: 1, found: 2, .. }
        ));
    }

    #[test]
    fn test_duplicate_id() {
        let first = paragraph(0, "a");
        let mut second = paragraph(1, "b");
        if let (Block::Paragraph(a), Block::Paragraph(b)) = (&first, &mut second) {
            b.id = a.id;
        }
        let report = IntegrityChecker::new().check(&model(vec![first, second]), &[]);
        assert_eq!(report.worst_severity(), Some(IssueSeverity::Critical));
    }

    #[test]
    fn test_stale_placeholders_and_unknown_asset() {
        let mut m = model(vec![paragraph(0, "a")]);
        if let Block::Paragraph(p) = &mut m.blocks[0] {
            p.runs.push(Run::Image(ImageRun::inline(AssetId::new(), 10, 10)));
            if let Run::Text(run) = &mut p.runs[0] {
                run.text = "{{NEU}}".into();
            }
        }
        let report = IntegrityChecker::new().check(&m, &[]);
        assert!(report.issues.iter().any(|i| matches!(i, IntegrityIssue::StalePlaceholders { .. })));
        assert!(report.issues.contains(&IntegrityIssue::StaleDocumentPlaceholders));
        assert!(report.issues.iter().any(|i| matches!(i, IntegrityIssue::UnknownAsset { .. })));
    }

    #[test]
    fn test_check_source() {
        let mut m = model(vec![]);
        m.metadata.preview_version = sha256_hex(b"original");
        let checker = IntegrityChecker::new();
        assert!(checker.check_source(&m, b"original").is_none());
        assert!(checker.check_source(&m, b"tampered").is_some());
    }
}
