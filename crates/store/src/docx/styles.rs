//! Styles.xml parser
//!
//! Builds the raw style catalogue. Property elements of `w:pPr`/`w:rPr`
//! blocks are flattened into `key -> value` pairs:
//!
//! - `<w:jc w:val="center"/>` becomes `jc = center`
//! - `<w:spacing w:before="240" w:after="120"/>` becomes `spacing.before = 240`
//!   and `spacing.after = 120`
//! - `<w:b/>` becomes `b = 1`
//!
//! Only direct children of a property block are recorded.

use crate::docx::error::{DocxError, DocxResult};
use crate::docx::reader::XmlParser;
use doc_model::{StyleCatalogue, StyleDefinition, StyleKind, StyleProperties};
use quick_xml::events::{BytesStart, Event};
use sha2::{Digest, Sha256};

/// Flatten one property element into `key -> value` pairs
pub fn flatten_property(e: &BytesStart) -> Vec<(String, String)> {
    let name = XmlParser::local_name(e.name().as_ref()).to_string();
    let attributes = XmlParser::local_attributes(e);

    if attributes.is_empty() {
        return vec![(name, "1".to_string())];
    }
    attributes
        .into_iter()
        .map(|(attr, value)| {
            if attr == "val" {
                (name.clone(), value)
            } else {
                (format!("{}.{}", name, attr), value)
            }
        })
        .collect()
}

/// Merge a flattened property element into a property map
pub fn apply_property(target: &mut StyleProperties, e: &BytesStart) {
    for (key, value) in flatten_property(e) {
        target.insert(key, value);
    }
}

/// Style key of a run: hash of its raw `w:rPr` block. Runs without
/// overrides share the empty key.
pub fn run_style_key(raw_rpr: &str) -> String {
    if raw_rpr.is_empty() {
        return String::new();
    }
    let digest = Sha256::digest(raw_rpr.as_bytes());
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Clone, Copy)]
enum PropertyTarget {
    DefaultParagraph,
    DefaultRun,
    StyleParagraph,
    StyleRun,
}

/// Parser for styles.xml
pub struct StylesParser;

impl StylesParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse styles.xml into a catalogue
    pub fn parse(&self, content: &str) -> DocxResult<StyleCatalogue> {
        let mut catalogue = StyleCatalogue::new();
        let mut reader = XmlParser::from_string(content);
        let mut buf = Vec::new();

        let mut depth = 0usize;
        let mut doc_defaults_depth: Option<usize> = None;
        let mut style_depth: Option<usize> = None;
        let mut current: Option<StyleDefinition> = None;
        // Target and depth of the open property block
        let mut block: Option<(PropertyTarget, usize)> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    depth += 1;
                    if let Some((target, block_depth)) = block {
                        if depth == block_depth + 1 {
                            Self::apply(&mut catalogue, current.as_mut(), target, e);
                        }
                    } else {
                        let name = e.name();
                        match XmlParser::local_name(name.as_ref()) {
                            "docDefaults" => doc_defaults_depth = Some(depth),
                            "style" => {
                                current = Some(Self::start_style(e));
                                style_depth = Some(depth);
                            }
                            "pPr" if doc_defaults_depth.map(|d| depth == d + 2).unwrap_or(false) => {
                                block = Some((PropertyTarget::DefaultParagraph, depth));
                            }
                            "rPr" if doc_defaults_depth.map(|d| depth == d + 2).unwrap_or(false) => {
                                block = Some((PropertyTarget::DefaultRun, depth));
                            }
                            "pPr" if style_depth.map(|d| depth == d + 1).unwrap_or(false) => {
                                block = Some((PropertyTarget::StyleParagraph, depth));
                            }
                            "rPr" if style_depth.map(|d| depth == d + 1).unwrap_or(false) => {
                                block = Some((PropertyTarget::StyleRun, depth));
                            }
                            _ => {}
                        }
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    if let Some((target, block_depth)) = block {
                        if depth == block_depth {
                            Self::apply(&mut catalogue, current.as_mut(), target, e);
                        }
                    } else if let (Some(style), Some(d)) = (current.as_mut(), style_depth) {
                        if depth == d {
                            Self::style_element(e, style);
                        }
                    }
                }
                Ok(Event::End(ref e)) => {
                    if block.map(|(_, d)| d == depth).unwrap_or(false) {
                        block = None;
                    }
                    let name = e.name();
                    match XmlParser::local_name(name.as_ref()) {
                        "style" if style_depth == Some(depth) => {
                            if let Some(style) = current.take() {
                                catalogue.insert(style);
                            }
                            style_depth = None;
                        }
                        "docDefaults" if doc_defaults_depth == Some(depth) => {
                            doc_defaults_depth = None;
                        }
                        _ => {}
                    }
                    depth = depth.saturating_sub(1);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(DocxError::from(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(catalogue)
    }

    fn start_style(e: &BytesStart) -> StyleDefinition {
        let kind = XmlParser::get_w_attribute(e, "type")
            .map(|t| StyleKind::from_ooxml(&t))
            .unwrap_or(StyleKind::Paragraph);
        let id = XmlParser::get_w_attribute(e, "styleId").unwrap_or_default();
        let mut style = StyleDefinition::new(id, kind);
        style.is_default = XmlParser::get_w_attribute(e, "default")
            .map(|v| XmlParser::parse_bool(&v))
            .unwrap_or(false);
        style
    }

    /// Parse a style element (name, basedOn)
    fn style_element(e: &BytesStart, style: &mut StyleDefinition) {
        let name = e.name();
        match XmlParser::local_name(name.as_ref()) {
            "name" => style.name = XmlParser::get_w_attribute(e, "val"),
            "basedOn" => style.based_on = XmlParser::get_w_attribute(e, "val"),
            _ => {}
        }
    }

    fn apply(
        catalogue: &mut StyleCatalogue,
        style: Option<&mut StyleDefinition>,
        target: PropertyTarget,
        e: &BytesStart,
    ) {
        match target {
            PropertyTarget::DefaultParagraph => {
                apply_property(&mut catalogue.default_paragraph_properties, e)
            }
            PropertyTarget::DefaultRun => apply_property(&mut catalogue.default_run_properties, e),
            PropertyTarget::StyleParagraph => {
                if let Some(style) = style {
                    apply_property(&mut style.paragraph_properties, e);
                }
            }
            PropertyTarget::StyleRun => {
                if let Some(style) = style {
                    apply_property(&mut style.run_properties, e);
                }
            }
        }
    }
}

impl Default for StylesParser {
    fn default() -> Self {
        Self::new()
    }
}
