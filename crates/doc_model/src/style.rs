//! Style catalogue and style resolution
//!
//! The catalogue keeps each style's properties as an opaque `key -> value`
//! map flattened from the OOXML property blocks (`jc=center`,
//! `spacing.before=240`, `b=1`). Resolution walks the `basedOn` chain from
//! the base style to the most derived one, so later entries win, and applies
//! inline overrides last.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Flattened property block
pub type StyleProperties = BTreeMap<String, String>;

/// Highest outline level (exclusive) that still counts as a heading
pub const HEADING_OUTLINE_LIMIT: u8 = 4;

/// Kind of a style definition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StyleKind {
    #[default]
    Paragraph,
    Character,
    Table,
    Numbering,
}

impl StyleKind {
    /// Parse the `w:type` attribute of a style
    pub fn from_ooxml(value: &str) -> Self {
        match value {
            "character" => Self::Character,
            "table" => Self::Table,
            "numbering" => Self::Numbering,
            _ => Self::Paragraph,
        }
    }
}

/// One `w:style` entry of the catalogue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDefinition {
    pub id: String,
    pub name: Option<String>,
    pub kind: StyleKind,
    pub based_on: Option<String>,
    pub is_default: bool,
    #[serde(default)]
    pub paragraph_properties: StyleProperties,
    #[serde(default)]
    pub run_properties: StyleProperties,
}

impl StyleDefinition {
    pub fn new(id: impl Into<String>, kind: StyleKind) -> Self {
        Self {
            id: id.into(),
            kind,
            ..Default::default()
        }
    }
}

/// The document's style catalogue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleCatalogue {
    pub styles: BTreeMap<String, StyleDefinition>,
    /// `w:docDefaults/w:pPrDefault`
    #[serde(default)]
    pub default_paragraph_properties: StyleProperties,
    /// `w:docDefaults/w:rPrDefault`
    #[serde(default)]
    pub default_run_properties: StyleProperties,
}

impl StyleCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, style: StyleDefinition) {
        self.styles.insert(style.id.clone(), style);
    }

    pub fn get(&self, id: &str) -> Option<&StyleDefinition> {
        self.styles.get(id)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// The paragraph style marked `w:default="1"`, if any
    pub fn default_paragraph_style(&self) -> Option<&StyleDefinition> {
        self.styles
            .values()
            .find(|s| s.kind == StyleKind::Paragraph && s.is_default)
    }

    /// The `basedOn` chain of a style ordered from the base ancestor to the
    /// style itself. A cycle stops the walk at the first repeated id.
    pub fn inheritance_chain(&self, style_id: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(style_id.to_string());

        while let Some(id) = current {
            if !visited.insert(id.clone()) {
                break;
            }
            match self.styles.get(&id) {
                Some(style) => {
                    current = style.based_on.clone();
                    chain.push(id);
                }
                None => break,
            }
        }

        chain.reverse();
        chain
    }

    /// Resolve the effective paragraph style for an optional style id and
    /// the paragraph's inline `w:pPr` overrides.
    ///
    /// Without an explicit id the catalogue's default paragraph style is used.
    pub fn resolve_paragraph(
        &self,
        style_id: Option<&str>,
        inline: &StyleProperties,
    ) -> ParagraphStyle {
        let effective_id = style_id
            .map(str::to_string)
            .or_else(|| self.default_paragraph_style().map(|s| s.id.clone()));

        let mut properties = self.default_paragraph_properties.clone();
        let mut run_properties = self.default_run_properties.clone();

        let chain = effective_id
            .as_deref()
            .map(|id| self.inheritance_chain(id))
            .unwrap_or_default();

        for id in &chain {
            if let Some(style) = self.styles.get(id) {
                overlay(&mut properties, &style.paragraph_properties);
                overlay(&mut run_properties, &style.run_properties);
            }
        }

        overlay(&mut properties, inline);

        let style_name = effective_id
            .as_deref()
            .and_then(|id| self.styles.get(id))
            .and_then(|s| s.name.clone());

        ParagraphStyle {
            style_id: effective_id,
            style_name,
            properties,
            run_properties,
            inheritance_chain: chain,
        }
    }
}

fn overlay(target: &mut StyleProperties, source: &StyleProperties) {
    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }
}

fn is_on(value: Option<&String>) -> bool {
    value
        .map(|v| !matches!(v.as_str(), "0" | "false" | "off"))
        .unwrap_or(false)
}

/// Effective style of a paragraph after inheritance and inline overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyle {
    pub style_id: Option<String>,
    pub style_name: Option<String>,
    pub properties: StyleProperties,
    /// Run defaults contributed by the paragraph style chain
    #[serde(default)]
    pub run_properties: StyleProperties,
    #[serde(default)]
    pub inheritance_chain: Vec<String>,
}

impl ParagraphStyle {
    /// 0-based outline level (`w:outlineLvl`); Heading 1 is level 0
    pub fn outline_level(&self) -> Option<u8> {
        self.properties.get("outlineLvl")?.parse().ok()
    }

    /// Whether this paragraph acts as a section boundary
    pub fn is_heading(&self) -> bool {
        self.outline_level()
            .map(|level| level < HEADING_OUTLINE_LIMIT)
            .unwrap_or(false)
    }

    pub fn alignment(&self) -> Option<&str> {
        self.properties.get("jc").map(String::as_str)
    }

    pub fn spacing_before_twips(&self) -> i64 {
        self.twips("spacing.before")
    }

    pub fn spacing_after_twips(&self) -> i64 {
        self.twips("spacing.after")
    }

    pub fn page_break_before(&self) -> bool {
        is_on(self.properties.get("pageBreakBefore"))
    }

    /// Font size in points from the inherited run defaults (`w:sz`)
    pub fn font_size_pt(&self) -> Option<f64> {
        let half_points: i64 = self.run_properties.get("sz")?.parse().ok()?;
        Some(crate::units::half_points_to_pt(half_points))
    }

    fn twips(&self, key: &str) -> i64 {
        self.properties
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

/// Flat style of a single run: its own `w:rPr` block, no inheritance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStyle {
    /// Content hash of the raw override block; equal keys mean visually
    /// identical runs. Empty when the run has no overrides.
    pub style_key: String,
    pub properties: StyleProperties,
}

impl RunStyle {
    pub fn new(style_key: impl Into<String>, properties: StyleProperties) -> Self {
        Self {
            style_key: style_key.into(),
            properties,
        }
    }

    pub fn is_bold(&self) -> bool {
        is_on(self.properties.get("b"))
    }

    pub fn is_italic(&self) -> bool {
        is_on(self.properties.get("i"))
    }

    pub fn font_size_pt(&self) -> Option<f64> {
        let half_points: i64 = self.properties.get("sz")?.parse().ok()?;
        Some(crate::units::half_points_to_pt(half_points))
    }
}
