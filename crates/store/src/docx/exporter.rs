//! DOCX exporter
//!
//! Writes the model back into the original binary with surgical splices:
//! changed paragraphs get their text redistributed over their original
//! `w:t` nodes, changed floating objects get their size and offset values
//! rewritten inside the verbatim anchor fragment, deleted objects lose their
//! `w:drawing`. Every other byte of a patched part, and every untouched
//! entry of the archive, is carried over as is.

use crate::docx::content_types::{insert_default, media_content_type, ContentTypes, CONTENT_TYPES_PART};
use crate::docx::error::{DocxError, ExportError, ExportResult};
use crate::docx::redistribute::redistribute;
use crate::docx::xml_index::{apply_splices, index_part, ParagraphSpan, PartIndex, Splice, TextNode};
use doc_model::units::px_to_emu;
use doc_model::{Asset, AssetId, DocumentModel, DocumentObject, NodeId, PageGeometry, ParagraphBlock};
use quick_xml::escape::partial_escape;
use regex_lite::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read, Write};
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// What an export changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportReport {
    pub patched_paragraphs: usize,
    pub patched_objects: usize,
    pub removed_drawings: usize,
    pub added_media: Vec<String>,
    /// Changed paragraphs whose node could not be found
    pub skipped_blocks: Vec<NodeId>,
}

impl ExportReport {
    pub fn is_unchanged(&self) -> bool {
        self.patched_paragraphs == 0
            && self.patched_objects == 0
            && self.removed_drawings == 0
            && self.added_media.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub bytes: Vec<u8>,
    pub report: ExportReport,
}

/// Archive path of an asset binary. Imported assets keep the entry they
/// were read from.
pub fn media_path(asset: &Asset) -> String {
    match &asset.source_path {
        Some(path) => path.clone(),
        None => format!("word/media/{}", asset.filename),
    }
}

#[derive(Default)]
struct PartPlan<'m> {
    paragraphs: Vec<&'m ParagraphBlock>,
    objects: Vec<&'m DocumentObject>,
    removed: BTreeSet<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct DocxExporter;

impl DocxExporter {
    pub fn new() -> Self {
        Self
    }

    /// Export `model` against its pristine source binary. Of `new_assets`,
    /// only those referenced by a live floating object are written, and only
    /// when the archive has no entry at their path yet.
    pub fn export(
        &self,
        model: &DocumentModel,
        original: &[u8],
        new_assets: &[Asset],
    ) -> ExportResult<ExportedDocument> {
        let mut archive = ZipArchive::new(Cursor::new(original)).map_err(DocxError::from)?;
        let existing: BTreeSet<String> = archive.file_names().map(str::to_string).collect();

        let mut plans: BTreeMap<String, PartPlan> = BTreeMap::new();
        for paragraph in model.paragraphs().filter(|p| p.is_changed()) {
            plans
                .entry(paragraph.xml_path.clone())
                .or_default()
                .paragraphs
                .push(paragraph);
        }
        for object in model.document_objects.iter().filter(|o| o.is_changed()) {
            if let Some(source) = &object.source {
                plans.entry(source.xml_path.clone()).or_default().objects.push(object);
            }
        }
        for removed in &model.removed_anchors {
            plans
                .entry(removed.xml_path.clone())
                .or_default()
                .removed
                .insert(removed.anchor_index);
        }

        let referenced: BTreeSet<AssetId> = model
            .document_objects
            .iter()
            .filter_map(|o| o.asset_id)
            .collect();
        let mut media: BTreeMap<String, &Asset> = BTreeMap::new();
        for asset in new_assets.iter().filter(|a| referenced.contains(&a.id)) {
            let path = media_path(asset);
            if !existing.contains(&path) {
                media.entry(path).or_insert(asset);
            }
        }

        let mut report = ExportReport::default();
        if plans.is_empty() && media.is_empty() {
            debug!("no changes, returning original binary");
            return Ok(ExportedDocument {
                bytes: original.to_vec(),
                report,
            });
        }

        let geometry = model.page_geometry();
        let mut replaced: BTreeMap<String, String> = BTreeMap::new();
        for (part, plan) in &plans {
            if !existing.contains(part) {
                warn!(part = %part, "changed part is missing from the original binary");
                report
                    .skipped_blocks
                    .extend(plan.paragraphs.iter().map(|p| p.id));
                continue;
            }
            let xml = read_string(&mut archive, part)?;
            let patched = patch_part(part, &xml, plan, geometry, &mut report)?;
            if patched != xml {
                replaced.insert(part.clone(), patched);
            }
        }

        if !media.is_empty() {
            let content_types_xml = read_string(&mut archive, CONTENT_TYPES_PART)?;
            let content_types = ContentTypes::parse(&content_types_xml)?;
            let extensions: BTreeSet<String> = media
                .values()
                .filter_map(|a| a.extension())
                .filter(|ext| !content_types.has_default(ext))
                .collect();
            if !extensions.is_empty() {
                let mut patched = content_types_xml;
                for ext in &extensions {
                    patched = insert_default(&patched, ext, media_content_type(ext))?;
                }
                replaced.insert(CONTENT_TYPES_PART.to_string(), patched);
            }
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for i in 0..archive.len() {
            let name = match archive.name_for_index(i) {
                Some(name) => name.to_string(),
                None => continue,
            };
            match replaced.get(&name) {
                Some(content) => {
                    let method = archive.by_index(i).map_err(DocxError::from)?.compression();
                    writer.start_file(name.as_str(), SimpleFileOptions::default().compression_method(method))?;
                    writer.write_all(content.as_bytes())?;
                }
                None => {
                    let file = archive.by_index_raw(i).map_err(DocxError::from)?;
                    writer.raw_copy_file(file)?;
                }
            }
        }
        for (path, asset) in &media {
            writer.start_file(
                path.as_str(),
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            )?;
            writer.write_all(&asset.data)?;
            report.added_media.push(path.clone());
        }
        let bytes = writer.finish()?.into_inner();

        info!(
            paragraphs = report.patched_paragraphs,
            objects = report.patched_objects,
            removed = report.removed_drawings,
            media = report.added_media.len(),
            skipped = report.skipped_blocks.len(),
            "document exported"
        );
        Ok(ExportedDocument { bytes, report })
    }
}

fn read_string(archive: &mut ZipArchive<Cursor<&[u8]>>, path: &str) -> ExportResult<String> {
    let mut file = archive.by_name(path).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => DocxError::MissingPart(path.to_string()),
        other => DocxError::from(other),
    })?;
    let mut content = String::new();
    file.read_to_string(&mut content).map_err(DocxError::from)?;
    Ok(content)
}

/// The indexed paragraph a block was imported from
fn locate<'i>(index: &'i PartIndex, paragraph: &ParagraphBlock) -> Option<&'i ParagraphSpan> {
    match paragraph.cell {
        Some(cell) => index
            .tables
            .get(paragraph.node_index)?
            .paragraph(cell.row, cell.cell, cell.paragraph),
        None => index.paragraphs.get(paragraph.node_index),
    }
}

fn patch_part(
    part: &str,
    xml: &str,
    plan: &PartPlan,
    geometry: PageGeometry,
    report: &mut ExportReport,
) -> ExportResult<String> {
    let index = index_part(xml)?;
    let mut splices = Vec::new();

    let mut paragraphs = plan.paragraphs.clone();
    paragraphs.sort_by_key(|p| (p.node_index, p.cell.map(|c| (c.row, c.cell, c.paragraph))));
    let mut patched = Vec::new();
    for paragraph in paragraphs {
        let Some(span) = locate(&index, paragraph) else {
            warn!(part = %part, node_index = paragraph.node_index, block = %paragraph.id, "paragraph not found, skipped");
            report.skipped_blocks.push(paragraph.id);
            continue;
        };
        if span.text_nodes.is_empty() {
            warn!(part = %part, node_index = paragraph.node_index, block = %paragraph.id, "paragraph has no text node, skipped");
            report.skipped_blocks.push(paragraph.id);
            continue;
        }
        splices.extend(text_splices(xml, span, &paragraph.text()));
        patched.push(paragraph);
    }
    report.patched_paragraphs += patched.len();

    for anchor_index in &plan.removed {
        match index.anchors.get(*anchor_index) {
            Some(anchor) => {
                splices.push(Splice::new(anchor.drawing, ""));
                report.removed_drawings += 1;
            }
            None => warn!(part = %part, anchor_index, "removed anchor not found"),
        }
    }

    for object in &plan.objects {
        let Some(source) = &object.source else { continue };
        if plan.removed.contains(&source.anchor_index) {
            continue;
        }
        let Some(anchor) = index.anchors.get(source.anchor_index) else {
            warn!(part = %part, anchor_index = source.anchor_index, object = %object.id, "anchor not found, skipped");
            continue;
        };
        let fragment = anchor.anchor.slice(xml);
        let patched_fragment = patch_anchor(fragment, object, geometry);
        if patched_fragment != fragment {
            splices.push(Splice::new(anchor.anchor, patched_fragment));
            report.patched_objects += 1;
        }
    }

    let out = apply_splices(xml, splices)?;
    verify(part, &index, &out, &patched)?;
    Ok(out)
}

/// Splices that write `text` over the paragraph's text nodes
fn text_splices(xml: &str, span: &ParagraphSpan, text: &str) -> Vec<Splice> {
    let weights: Vec<usize> = span.text_nodes.iter().map(TextNode::char_len).collect();
    let slots = redistribute(text, &weights);

    let mut splices = Vec::new();
    for (node, slot) in span.text_nodes.iter().zip(slots) {
        if slot == node.text {
            continue;
        }
        let escaped = partial_escape(&slot);
        let preserve = !node.preserve && needs_preserve(&slot);
        let start_tag = node.start_tag.slice(xml);

        if node.self_closing {
            let open = start_tag.trim_end_matches("/>").trim_end();
            let attr = if preserve { r#" xml:space="preserve""# } else { "" };
            splices.push(Splice::new(
                node.element,
                format!("{}{}>{}</{}>", open, attr, escaped, tag_name(start_tag)),
            ));
        } else {
            if preserve {
                splices.push(Splice::new(node.start_tag, with_preserve(start_tag)));
            }
            splices.push(Splice::new(node.content, escaped.into_owned()));
        }
    }
    splices
}

fn needs_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace)
        || text.contains("  ")
        || text.contains(['\t', '\n'])
}

/// Qualified element name of a start tag
fn tag_name(start_tag: &str) -> &str {
    start_tag
        .trim_start_matches('<')
        .split(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .next()
        .unwrap_or("w:t")
}

fn with_preserve(start_tag: &str) -> String {
    let body = start_tag.strip_suffix('>').unwrap_or(start_tag);
    format!(r#"{} xml:space="preserve">"#, body)
}

/// Re-index the patched part and check every patched paragraph kept its
/// `w:t` and `w:r` counts and now reads as the model text
fn verify(part: &str, before: &PartIndex, patched_xml: &str, patched: &[&ParagraphBlock]) -> ExportResult<()> {
    if patched.is_empty() {
        return Ok(());
    }
    let after = index_part(patched_xml)?;

    for paragraph in patched {
        let failure = |detail: String| ExportError::Integrity {
            block_id: paragraph.id,
            xml_path: part.to_string(),
            detail,
        };
        let (Some(old), Some(new)) = (locate(before, paragraph), locate(&after, paragraph)) else {
            return Err(failure("paragraph lost after patching".into()));
        };
        if old.text_nodes.len() != new.text_nodes.len() {
            return Err(failure(format!(
                "w:t count changed from {} to {}",
                old.text_nodes.len(),
                new.text_nodes.len()
            )));
        }
        if old.run_count != new.run_count {
            return Err(failure(format!(
                "w:r count changed from {} to {}",
                old.run_count, new.run_count
            )));
        }
        if new.text() != paragraph.text() {
            return Err(failure("patched text differs from the model".into()));
        }
    }
    Ok(())
}

fn extent_tag() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<wp:extent\b[^>]*>").expect("extent pattern is a valid regex"))
}

fn ext_tag() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<a:ext\b[^>]*>").expect("ext pattern is a valid regex"))
}

fn cx_attr() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"\bcx="-?\d+""#).expect("cx pattern is a valid regex"))
}

fn cy_attr() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"\bcy="-?\d+""#).expect("cy pattern is a valid regex"))
}

fn offset_pattern(axis: &str) -> Regex {
    Regex::new(&format!(
        r"(<wp:{}\b[^>]*>\s*<wp:posOffset>)\s*-?\d+\s*(</wp:posOffset>)",
        axis
    ))
    .expect("offset pattern is a valid regex")
}

fn horizontal_offset() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| offset_pattern("positionH"))
}

fn vertical_offset() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| offset_pattern("positionV"))
}

/// Rewrite `cx`/`cy` inside every tag matched by `tag`
fn patch_size(fragment: &str, tag: &Regex, cx: i64, cy: i64) -> String {
    tag.replace_all(fragment, |caps: &regex_lite::Captures<'_>| {
        let element = &caps[0];
        let element = cx_attr().replace(element, format!(r#"cx="{}""#, cx).as_str());
        cy_attr()
            .replace(&element, format!(r#"cy="{}""#, cy).as_str())
            .into_owned()
    })
    .into_owned()
}

fn patch_offset(fragment: &str, pattern: &Regex, offset: i64) -> String {
    pattern
        .replace(fragment, |caps: &regex_lite::Captures<'_>| {
            format!("{}{}{}", &caps[1], offset, &caps[2])
        })
        .into_owned()
}

/// Patch size and position values of an anchor fragment from the object
fn patch_anchor(fragment: &str, object: &DocumentObject, geometry: PageGeometry) -> String {
    let (x, y) = match &object.placement_rule {
        Some(rule) if rule.lock_position => rule.resolve_position(
            geometry.width_px(),
            geometry.height_px(),
            (object.width_px, object.height_px),
            (object.x_px, object.y_px),
        ),
        _ => (object.x_px, object.y_px),
    };
    let cx = px_to_emu(object.width_px);
    let cy = px_to_emu(object.height_px);

    let out = patch_size(fragment, extent_tag(), cx, cy);
    let out = patch_size(&out, ext_tag(), cx, cy);
    let out = patch_offset(&out, horizontal_offset(), px_to_emu(x - object.origin_x_px));
    patch_offset(&out, vertical_offset(), px_to_emu(y - object.origin_y_px))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::xml_index::index_part;
    use doc_model::units::emu_to_px;
    use doc_model::{HorizontalAlign, ObjectType, PlacementRule, PlacementZone};

    fn body(paragraph: &str) -> String {
        format!(r#"<w:document><w:body>{}</w:body></w:document>"#, paragraph)
    }

    fn patch_text(xml: &str, text: &str) -> String {
        let index = index_part(xml).unwrap();
        let splices = text_splices(xml, &index.paragraphs[0], text);
        apply_splices(xml, splices).unwrap()
    }

    #[test]
    fn test_text_redistributed_over_original_nodes() {
        let xml = body(r#"<w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>World</w:t></w:r><w:r><w:t>0123456789</w:t></w:r></w:p>"#);
        let out = patch_text(&xml, "abcdefghijkl");
        assert_eq!(
            out,
            body(r#"<w:p><w:r><w:t>abc</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>def</w:t></w:r><w:r><w:t>ghijkl</w:t></w:r></w:p>"#)
        );
    }

    #[test]
    fn test_escaping_and_space_preservation() {
        let xml = body(r#"<w:p><w:r><w:t>ab</w:t></w:r><w:r><w:t/></w:r></w:p>"#);
        let out = patch_text(&xml, "a & b ");
        let index = index_part(&out).unwrap();
        assert_eq!(index.paragraphs[0].text(), "a & b ");
        assert!(out.contains(r#"<w:t xml:space="preserve">a &amp; b </w:t>"#));
        assert!(out.contains("<w:t/>"));
    }

    #[test]
    fn test_self_closing_node_is_expanded() {
        let xml = body(r#"<w:p><w:r><w:t/></w:r></w:p>"#);
        let out = patch_text(&xml, "neu");
        assert!(out.contains("<w:t>neu</w:t>"));
    }

    #[test]
    fn test_unchanged_nodes_are_not_touched() {
        let xml = body(r#"<w:p><w:r><w:t xml:space="preserve">Hallo </w:t></w:r><w:r><w:t>Welt</w:t></w:r></w:p>"#);
        assert_eq!(patch_text(&xml, "Hallo Welt"), xml);
    }

    #[test]
    fn test_verify_detects_lost_runs() {
        let xml = body(r#"<w:p><w:r><w:t>a</w:t></w:r><w:r><w:t>b</w:t></w:r></w:p>"#);
        let broken = body(r#"<w:p><w:r><w:t>ab</w:t></w:r></w:p>"#);
        let index = index_part(&xml).unwrap();
        let mut paragraph = ParagraphBlock::new("word/document.xml", 0, Default::default(), vec![]);
        paragraph.runs.push(doc_model::Run::Text(doc_model::TextRun::new("ab", Default::default())));
        let result = verify("word/document.xml", &index, &broken, &[&paragraph]);
        assert!(matches!(result, Err(ExportError::Integrity { .. })));
    }

    const ANCHOR: &str = r#"<wp:anchor behindDoc="0"><wp:positionH relativeFrom="page"><wp:posOffset>914400</wp:posOffset></wp:positionH><wp:positionV relativeFrom="page"><wp:posOffset>457200</wp:posOffset></wp:positionV><wp:extent cx="952500" cy="476250"/><a:graphic><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="952500" cy="476250"/></a:xfrm></pic:spPr><a:extLst><a:ext uri="{28A0092B}"/></a:extLst></a:graphic></wp:anchor>"#;

    fn object() -> DocumentObject {
        let mut object = DocumentObject::new(ObjectType::Logo, None);
        object.x_px = emu_to_px(914_400);
        object.y_px = emu_to_px(457_200);
        object.width_px = 100.0;
        object.height_px = 50.0;
        object
    }

    #[test]
    fn test_unchanged_object_keeps_fragment() {
        assert_eq!(patch_anchor(ANCHOR, &object(), PageGeometry::default()), ANCHOR);
    }

    #[test]
    fn test_move_and_resize_patch_values_only() {
        let mut moved = object();
        moved.x_px = 200.0;
        moved.width_px = 200.0;
        moved.height_px = 100.0;
        let out = patch_anchor(ANCHOR, &moved, PageGeometry::default());
        assert!(out.contains("<wp:posOffset>1905000</wp:posOffset></wp:positionH>"));
        assert!(out.contains("<wp:posOffset>457200</wp:posOffset></wp:positionV>"));
        assert!(out.contains(r#"<wp:extent cx="1905000" cy="952500"/>"#));
        assert!(out.contains(r#"<a:ext cx="1905000" cy="952500"/>"#));
        assert!(out.contains(r#"<a:ext uri="{28A0092B}"/>"#));
    }

    #[test]
    fn test_locked_footer_rule_repositions() {
        let mut locked = object();
        locked.placement_rule = Some(PlacementRule {
            zone: PlacementZone::Footer,
            align: HorizontalAlign::Right,
            margin_x_mm: 0.0,
            margin_y_mm: 0.0,
            lock_position: true,
        });
        let geometry = PageGeometry::default();
        let out = patch_anchor(ANCHOR, &locked, geometry);
        let x = px_to_emu(geometry.width_px() - 100.0);
        let y = px_to_emu(geometry.height_px() - 50.0);
        assert!(out.contains(&format!("<wp:posOffset>{}</wp:posOffset></wp:positionH>", x)));
        assert!(out.contains(&format!("<wp:posOffset>{}</wp:posOffset></wp:positionV>", y)));
    }
}
