//! Guardrails: which paragraphs may be rewritten, and which rewrites are
//! acceptable

use doc_model::placeholder::missing_placeholders;
use doc_model::{DocumentModel, NodeId, ParagraphBlock};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Guardrail switches and limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardrailConfig {
    pub exclude_header_footer: bool,
    pub exclude_tables: bool,
    pub exclude_near_signatures: bool,
    pub preserve_placeholders: bool,
    /// Run formatting is never sent to the service; the rewritten text is
    /// written back into the original runs. Also rejects Markdown markers.
    pub preserve_style: bool,
    /// Maximum new/original character ratio
    pub max_length_ratio: f64,
    /// Vertical distance (px) to a signature or stamp that excludes a block
    pub signature_proximity_px: f64,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            exclude_header_footer: true,
            exclude_tables: false,
            exclude_near_signatures: true,
            preserve_placeholders: true,
            preserve_style: true,
            max_length_ratio: 1.5,
            signature_proximity_px: 150.0,
        }
    }
}

impl GuardrailConfig {
    /// Human-readable summary sent with every completion request
    pub fn summary(&self) -> String {
        let mut rules = Vec::new();
        if self.preserve_placeholders {
            rules.push("Keep every {{PLACEHOLDER}} token exactly as written.".to_string());
        }
        if self.preserve_style {
            rules.push("Return plain text only, no Markdown.".to_string());
        }
        rules.push(format!(
            "Each text may grow to at most {:.1} times its original length.",
            self.max_length_ratio
        ));
        rules.push("Return a JSON object mapping each block id to its new text.".to_string());
        rules.join(" ")
    }
}

/// Why a block was left out before the service call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    HeaderFooter,
    Table,
    NearSignature,
    NoTextRun,
}

/// Why a returned rewrite was refused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RejectionReason {
    ConcurrentModification,
    LengthRatioExceeded { ratio: f64, max: f64 },
    PlaceholdersMissing { missing: Vec<String> },
    MarkdownDetected,
    InvalidAiResponse,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::ConcurrentModification => write!(f, "concurrent modification"),
            RejectionReason::LengthRatioExceeded { ratio, max } => {
                write!(f, "length ratio {:.2} exceeds {:.2}", ratio, max)
            }
            RejectionReason::PlaceholdersMissing { missing } => {
                write!(f, "placeholders absent: {}", missing.join(", "))
            }
            RejectionReason::MarkdownDetected => write!(f, "markdown formatting not allowed"),
            RejectionReason::InvalidAiResponse => write!(f, "invalid AI response"),
        }
    }
}

/// Pre-filter a paragraph before it is sent to the service
pub fn skip_reason(
    model: &DocumentModel,
    paragraph: &ParagraphBlock,
    config: &GuardrailConfig,
) -> Option<SkipReason> {
    if !paragraph.has_text_run() {
        return Some(SkipReason::NoTextRun);
    }
    if config.exclude_header_footer && paragraph.part_kind().is_header_or_footer() {
        return Some(SkipReason::HeaderFooter);
    }
    if config.exclude_tables && paragraph.is_in_table() {
        return Some(SkipReason::Table);
    }
    if config.exclude_near_signatures && is_near_signature(model, paragraph.id, config) {
        return Some(SkipReason::NearSignature);
    }
    None
}

/// Whether the block holding the paragraph was placed within the proximity
/// of a signature or stamp on the same page
fn is_near_signature(model: &DocumentModel, paragraph_id: NodeId, config: &GuardrailConfig) -> bool {
    let Some(block) = model.block_of_paragraph(paragraph_id) else {
        return false;
    };
    let block_id = block.id();
    let Some(page) = model.page_of_block(block_id) else {
        return false;
    };
    let Some(placement) = page.placements.iter().find(|p| p.block_id == block_id) else {
        return false;
    };

    let top = placement.y_px;
    let bottom = placement.y_px + placement.height_px;
    model
        .signature_objects()
        .filter(|o| o.page_number == page.number)
        .any(|o| {
            let gap = (o.y_px - bottom).max(top - (o.y_px + o.height_px)).max(0.0);
            gap <= config.signature_proximity_px
        })
}

fn markdown_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)(\*\*|__|`|^\s{0,3}#{1,6}\s|^\s*[-*+]\s|\[[^\]]*\]\([^)]*\))")
            .expect("markdown pattern is a valid regex")
    })
}

pub fn contains_markdown(text: &str) -> bool {
    markdown_pattern().is_match(text)
}

/// Check a candidate against the content guardrails. The optimistic lock is
/// checked by the caller before this.
pub fn check_candidate(
    original: &str,
    candidate: &str,
    config: &GuardrailConfig,
) -> Result<(), RejectionReason> {
    let original_len = original.chars().count();
    let candidate_len = candidate.chars().count();
    if original_len == 0 {
        if candidate_len > 0 {
            return Err(RejectionReason::LengthRatioExceeded {
                ratio: f64::INFINITY,
                max: config.max_length_ratio,
            });
        }
    } else {
        let ratio = candidate_len as f64 / original_len as f64;
        if ratio > config.max_length_ratio {
            return Err(RejectionReason::LengthRatioExceeded {
                ratio,
                max: config.max_length_ratio,
            });
        }
    }

    if config.preserve_placeholders {
        let missing = missing_placeholders(original, candidate);
        if !missing.is_empty() {
            return Err(RejectionReason::PlaceholdersMissing { missing });
        }
    }

    if config.preserve_style && contains_markdown(candidate) {
        return Err(RejectionReason::MarkdownDetected);
    }
    Ok(())
}
