//! DOCX importer
//!
//! Turns a DOCX binary into a [`DocumentModel`]. Every content part (main
//! document, headers, footers) is indexed once with [`index_part`]; each
//! indexed paragraph is then parsed from its own byte span, so the
//! `nodeIndex` a block receives here is exactly the ordinal the exporter
//! will look up later.

use crate::docx::assets::{sha256_hex, AssetExtractor};
use crate::docx::classify::{ClassificationInput, ClassifierConfig, ImageClassifier};
use crate::docx::content_types::{ContentTypes, CONTENT_TYPES_PART};
use crate::docx::error::{DocxError, DocxResult, ImportError};
use crate::docx::layout::{LayoutConfig, PageEstimator};
use crate::docx::reader::{DocxReader, XmlParser};
use crate::docx::relationships::{rels_path_for, Relationships};
use crate::docx::styles::{apply_property, run_style_key, StylesParser};
use crate::docx::xml_index::{index_part, ParagraphSpan, PartIndex, TopLevel};
use doc_model::units::{emu_to_px, twips_to_px};
use doc_model::{
    AnchorRef, AnchorType, Asset, AssetId, Block, CellAddress, DocumentModel, DocumentObject,
    ImageRun, NodeId, ObjectType, PageGeometry, ParagraphBlock, PartKind, Run, RunStyle,
    StyleCatalogue, StyleProperties, TableBlock, TableCell, TableRow, TextRun, WrapMode,
    MAIN_DOCUMENT_PART,
};
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{Read, Seek};
use tracing::{debug, info, warn};

pub const STYLES_PART: &str = "word/styles.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningKind {
    /// A relationship points at a media entry the archive does not contain
    MissingImage,
    /// A drawing references a relationship id the part does not define
    UnresolvedRelationship,
    /// A floating drawing could not be addressed for export
    UnindexedAnchor,
}

/// Non-fatal problem found during import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportWarning {
    pub kind: WarningKind,
    pub xml_path: String,
    pub detail: String,
}

impl ImportWarning {
    fn new(kind: WarningKind, xml_path: &str, detail: impl Into<String>) -> Self {
        let warning = Self {
            kind,
            xml_path: xml_path.to_string(),
            detail: detail.into(),
        };
        warn!(part = %warning.xml_path, kind = ?warning.kind, "{}", warning.detail);
        warning
    }
}

#[derive(Debug, Clone)]
pub struct ImportResult {
    pub model: DocumentModel,
    pub assets: Vec<Asset>,
    pub warnings: Vec<ImportWarning>,
}

#[derive(Debug, Clone, Default)]
pub struct DocxImporter {
    classifier: ImageClassifier,
    estimator: PageEstimator,
}

impl DocxImporter {
    pub fn new(classifier: ClassifierConfig, layout: LayoutConfig) -> Self {
        Self {
            classifier: ImageClassifier::new(classifier),
            estimator: PageEstimator::new(layout),
        }
    }

    pub fn import(
        &self,
        bytes: &[u8],
        project_id: &str,
        source_filename: Option<&str>,
    ) -> Result<ImportResult, ImportError> {
        let mut reader =
            DocxReader::from_bytes(bytes).map_err(|e| ImportError::InvalidArchive(e.to_string()))?;
        if !reader.file_exists(MAIN_DOCUMENT_PART) {
            return Err(ImportError::MissingMainPart(MAIN_DOCUMENT_PART.to_string()));
        }

        let content_types = match reader
            .read_optional_string(CONTENT_TYPES_PART)
            .map_err(|e| malformed(CONTENT_TYPES_PART, e))?
        {
            Some(xml) => ContentTypes::parse(&xml).map_err(|e| malformed(CONTENT_TYPES_PART, e))?,
            None => ContentTypes::default(),
        };
        let styles = match reader
            .read_optional_string(STYLES_PART)
            .map_err(|e| malformed(STYLES_PART, e))?
        {
            Some(xml) => StylesParser::new()
                .parse(&xml)
                .map_err(|e| malformed(STYLES_PART, e))?,
            None => StyleCatalogue::new(),
        };

        let mut parts = vec![MAIN_DOCUMENT_PART.to_string()];
        parts.extend(reader.header_footer_parts());

        let mut media = Media {
            extractor: AssetExtractor::new(project_id, &content_types),
            reader,
        };
        let mut collected = Collected::default();
        let mut geometry = PageGeometry::default();

        for part in &parts {
            let xml = media
                .reader
                .read_file_as_string(part)
                .map_err(|e| malformed(part, e))?;
            let index = index_part(&xml).map_err(|e| malformed(part, e))?;
            let rels = match media
                .reader
                .read_optional_string(&rels_path_for(part))
                .map_err(|e| malformed(part, e))?
            {
                Some(rels) => Relationships::parse(&rels).map_err(|e| malformed(part, e))?,
                None => Relationships::new(),
            };

            if part == MAIN_DOCUMENT_PART {
                if let Some(span) = index.section_properties {
                    geometry = parse_geometry(span.slice(&xml)).map_err(|e| malformed(part, e))?;
                }
            }

            let mut importer = PartImporter {
                xml_path: part,
                xml: &xml,
                index: &index,
                rels: &rels,
                styles: &styles,
                media: &mut media,
                collected: &mut collected,
            };
            importer.run().map_err(|e| malformed(part, e))?;
            debug!(part = %part, paragraphs = index.paragraphs.len(), tables = index.tables.len(), "part imported");
        }

        let mut model = DocumentModel::new();
        model.styles = styles;
        model.blocks = collected.blocks;
        model.pages = self
            .estimator
            .estimate(&model.blocks, geometry, &collected.page_breaks);

        for pending in collected.anchors {
            let object = self.build_object(&model, geometry, pending);
            model.document_objects.push(object);
        }

        model.metadata.page_count = model.pages.len() as u32;
        model.metadata.has_headers = parts.iter().any(|p| PartKind::from_xml_path(p) == PartKind::Header);
        model.metadata.has_footers = parts.iter().any(|p| PartKind::from_xml_path(p) == PartKind::Footer);
        model.metadata.preview_version = sha256_hex(bytes);
        model.metadata.source_filename = source_filename.map(str::to_string);
        model.refresh_placeholders();
        model.refresh_object_flags();

        let assets = media.extractor.into_assets();
        info!(
            blocks = model.blocks.len(),
            pages = model.metadata.page_count,
            objects = model.document_objects.len(),
            assets = assets.len(),
            warnings = collected.warnings.len(),
            "document imported"
        );

        Ok(ImportResult {
            model,
            assets,
            warnings: collected.warnings,
        })
    }

    fn build_object(&self, model: &DocumentModel, geometry: PageGeometry, pending: PendingAnchor) -> DocumentObject {
        let drawing = &pending.drawing;
        let part_kind = PartKind::from_xml_path(&pending.source.xml_path);
        let width_px = emu_to_px(drawing.cx);
        let height_px = emu_to_px(drawing.cy);

        let placement = model
            .block_of_paragraph(pending.paragraph_id)
            .and_then(|block| {
                model.pages.iter().find_map(|page| {
                    page.placements
                        .iter()
                        .find(|p| p.block_id == block.id())
                        .map(|p| (page.number, p.y_px))
                })
            });
        let (page_number, block_y) = placement.unwrap_or((1, 0.0));

        let page_w = geometry.width_px();
        let page_h = geometry.height_px();
        let flow_y = match part_kind {
            PartKind::Header => twips_to_px(geometry.header_twips),
            PartKind::Footer => page_h - twips_to_px(geometry.footer_twips) - height_px,
            _ => twips_to_px(geometry.margin_top_twips) + block_y,
        };
        let horizontal = AxisFrame {
            page_extent: page_w,
            margin_start: twips_to_px(geometry.margin_left_twips),
            margin_end: twips_to_px(geometry.margin_right_twips),
            flow_origin: twips_to_px(geometry.margin_left_twips),
        };
        let vertical = AxisFrame {
            page_extent: page_h,
            margin_start: twips_to_px(geometry.margin_top_twips),
            margin_end: twips_to_px(geometry.margin_bottom_twips),
            flow_origin: flow_y,
        };
        let x_px = drawing.horizontal.resolve(&horizontal, width_px);
        let y_px = drawing.vertical.resolve(&vertical, height_px);

        let object_type = match (&pending.asset_id, drawing.textbox) {
            (Some(_), _) => ObjectType::Image,
            (None, true) => ObjectType::Textbox,
            (None, false) => ObjectType::Shape,
        };
        let mut object = DocumentObject::new(object_type, pending.asset_id);
        object.x_px = x_px;
        object.y_px = y_px;
        object.width_px = width_px;
        object.height_px = height_px;
        object.rotation_deg = drawing.rotation.map(|r| r as f64 / 60_000.0).unwrap_or(0.0);
        object.page_number = page_number;
        object.anchor = AnchorType::Floating;
        object.wrap = drawing.wrap.unwrap_or(if drawing.behind_doc {
            WrapMode::BehindText
        } else {
            WrapMode::InFrontOfText
        });
        object.z_order = drawing.z_order;
        object.origin_x_px = drawing.horizontal.area(&horizontal).0;
        object.origin_y_px = drawing.vertical.area(&vertical).0;
        object.raw_xml = pending.raw_xml;
        object.source = Some(pending.source);

        if object.asset_id.is_some() {
            let mut nearby_text = nearby_text(model, pending.paragraph_id);
            nearby_text.push(' ');
            nearby_text.push_str(&drawing.description);
            let classification = self.classifier.classify(&ClassificationInput {
                part_kind,
                width_emu: drawing.cx,
                height_emu: drawing.cy,
                y_px,
                page_height_px: page_h,
                nearby_text,
            });
            object.object_type = classification.object_type;
            object.classification_confidence = classification.confidence;
            object.classification_reasons = classification.reasons;
            object.ambiguous = classification.ambiguous;
        }
        object
    }
}

fn malformed(part: &str, source: DocxError) -> ImportError {
    ImportError::MalformedPart {
        part: part.to_string(),
        source,
    }
}

/// Text of the paragraph holding a drawing and its direct neighbours
fn nearby_text(model: &DocumentModel, paragraph_id: NodeId) -> String {
    let Some(anchor) = model.find_paragraph(paragraph_id) else {
        return String::new();
    };
    let siblings: Vec<&ParagraphBlock> = model
        .paragraphs()
        .filter(|p| p.xml_path == anchor.xml_path)
        .collect();
    let Some(pos) = siblings.iter().position(|p| p.id == paragraph_id) else {
        return String::new();
    };
    let from = pos.saturating_sub(1);
    let to = (pos + 2).min(siblings.len());
    siblings[from..to]
        .iter()
        .map(|p| p.text())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Page size and margins from a `w:sectPr` fragment
pub fn parse_geometry(section_xml: &str) -> DocxResult<PageGeometry> {
    let mut geometry = PageGeometry::default();
    let mut reader = XmlParser::from_string(section_xml);
    let mut buf = Vec::new();

    let read = |e: &BytesStart, name: &str, target: &mut i64| {
        if let Some(value) = XmlParser::get_w_attribute(e, name).and_then(|v| XmlParser::parse_i64(&v)) {
            *target = value;
        }
    };

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => match XmlParser::local_name(e.name().as_ref()) {
                "pgSz" => {
                    read(e, "w", &mut geometry.width_twips);
                    read(e, "h", &mut geometry.height_twips);
                }
                "pgMar" => {
                    read(e, "top", &mut geometry.margin_top_twips);
                    read(e, "bottom", &mut geometry.margin_bottom_twips);
                    read(e, "left", &mut geometry.margin_left_twips);
                    read(e, "right", &mut geometry.margin_right_twips);
                    read(e, "header", &mut geometry.header_twips);
                    read(e, "footer", &mut geometry.footer_twips);
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(DocxError::from(e)),
            _ => {}
        }
        buf.clear();
    }

    // Negative top/bottom margins mean "do not move text"; only the size matters here
    geometry.margin_top_twips = geometry.margin_top_twips.abs();
    geometry.margin_bottom_twips = geometry.margin_bottom_twips.abs();
    Ok(geometry)
}

struct Media<'c, R: Read + Seek> {
    reader: DocxReader<R>,
    extractor: AssetExtractor<'c>,
}

#[derive(Default)]
struct Collected {
    blocks: Vec<Block>,
    anchors: Vec<PendingAnchor>,
    page_breaks: HashSet<NodeId>,
    warnings: Vec<ImportWarning>,
}

struct PendingAnchor {
    paragraph_id: NodeId,
    source: AnchorRef,
    raw_xml: String,
    asset_id: Option<AssetId>,
    drawing: DrawingProps,
}

struct PartImporter<'a, 'c, R: Read + Seek> {
    xml_path: &'a str,
    xml: &'a str,
    index: &'a PartIndex,
    rels: &'a Relationships,
    styles: &'a StyleCatalogue,
    media: &'a mut Media<'c, R>,
    collected: &'a mut Collected,
}

impl<'a, 'c, R: Read + Seek> PartImporter<'a, 'c, R> {
    fn run(&mut self) -> DocxResult<()> {
        let index = self.index;
        for item in &index.order {
            match *item {
                TopLevel::Paragraph(i) => {
                    let span = &index.paragraphs[i];
                    let paragraph = self.paragraph(span, i, None)?;
                    self.collected.blocks.push(Block::Paragraph(paragraph));
                }
                TopLevel::Table(i) => {
                    let table = self.table(i)?;
                    self.collected.blocks.push(Block::Table(table));
                }
            }
        }
        Ok(())
    }

    fn table(&mut self, node_index: usize) -> DocxResult<TableBlock> {
        let index = self.index;
        let span = &index.tables[node_index];
        let mut table = TableBlock::new(self.xml_path, node_index);
        table.properties_xml = span
            .properties
            .map(|p| p.slice(self.xml).to_string())
            .unwrap_or_default();

        for (r, row_spans) in span.rows.iter().enumerate() {
            let mut row = TableRow::default();
            for (c, cell_spans) in row_spans.iter().enumerate() {
                let mut cell = TableCell::default();
                for (p, paragraph_span) in cell_spans.iter().enumerate() {
                    let address = CellAddress {
                        row: r,
                        cell: c,
                        paragraph: p,
                    };
                    cell.paragraphs
                        .push(self.paragraph(paragraph_span, node_index, Some(address))?);
                }
                row.cells.push(cell);
            }
            table.rows.push(row);
        }
        Ok(table)
    }

    fn paragraph(
        &mut self,
        span: &ParagraphSpan,
        node_index: usize,
        cell: Option<CellAddress>,
    ) -> DocxResult<ParagraphBlock> {
        let parsed = ParagraphParser::parse(span.span.slice(self.xml), span.span.start)?;
        let style = self
            .styles
            .resolve_paragraph(parsed.style_id.as_deref(), &parsed.inline);

        let mut runs = Vec::new();
        let mut floating = Vec::new();
        for run in parsed.runs {
            match run {
                ParsedRun::Text { text, style_key, properties } => {
                    runs.push(Run::Text(TextRun::new(text, RunStyle::new(style_key, properties))));
                }
                ParsedRun::Drawing(drawing) if drawing.floating => floating.push(drawing),
                ParsedRun::Drawing(drawing) => {
                    if let Some(asset_id) = self.asset(drawing.embed.as_deref()) {
                        runs.push(Run::Image(ImageRun::inline(asset_id, drawing.cx, drawing.cy)));
                    }
                }
            }
        }

        let mut paragraph = ParagraphBlock::new(self.xml_path, node_index, style, runs);
        paragraph.cell = cell;

        if parsed.page_break && cell.is_none() {
            self.collected.page_breaks.insert(paragraph.id);
        }
        for drawing in floating {
            self.anchor(paragraph.id, drawing);
        }
        Ok(paragraph)
    }

    fn anchor(&mut self, paragraph_id: NodeId, drawing: DrawingProps) {
        let Some(anchor_index) = self.index.anchor_at(drawing.offset) else {
            self.collected.warnings.push(ImportWarning::new(
                WarningKind::UnindexedAnchor,
                self.xml_path,
                format!("floating drawing at byte {} skipped", drawing.offset),
            ));
            return;
        };
        let asset_id = match drawing.embed.as_deref() {
            Some(_) => match self.asset(drawing.embed.as_deref()) {
                Some(id) => Some(id),
                // The image is gone; leave the drawing untouched in the XML
                None => return,
            },
            None => None,
        };
        let raw_xml = self.index.anchors[anchor_index]
            .anchor
            .slice(self.xml)
            .to_string();

        self.collected.anchors.push(PendingAnchor {
            paragraph_id,
            source: AnchorRef {
                xml_path: self.xml_path.to_string(),
                anchor_index,
            },
            raw_xml,
            asset_id,
            drawing,
        });
    }

    /// Resolve a blip relationship to an asset, recording a warning when
    /// the image cannot be read
    fn asset(&mut self, embed: Option<&str>) -> Option<AssetId> {
        let rel_id = embed?;
        let Some(path) = self.rels.resolve(self.xml_path, rel_id) else {
            self.collected.warnings.push(ImportWarning::new(
                WarningKind::UnresolvedRelationship,
                self.xml_path,
                format!("relationship {} not found", rel_id),
            ));
            return None;
        };
        match self.media.extractor.extract(&mut self.media.reader, &path) {
            Ok(id) => Some(id),
            Err(e) => {
                self.collected.warnings.push(ImportWarning::new(
                    WarningKind::MissingImage,
                    self.xml_path,
                    format!("image {} skipped: {}", path, e),
                ));
                None
            }
        }
    }
}

/// Position of a floating drawing along one axis
#[derive(Debug, Clone, Default, PartialEq)]
struct AxisPosition {
    relative_from: String,
    offset_emu: Option<i64>,
    align: Option<String>,
}

impl AxisPosition {
    /// Page range (px) the position is expressed in. `flow_origin` is used
    /// for positions relative to the paragraph, line or character.
    pub(crate) fn area(&self, frame: &AxisFrame) -> (f64, f64) {
        axis_area(&self.relative_from, frame)
    }

    pub(crate) fn resolve(&self, frame: &AxisFrame, size: f64) -> f64 {
        let (area_start, area_end) = self.area(frame);
        if let Some(align) = &self.align {
            return match align.as_str() {
                "center" => (area_start + area_end - size) / 2.0,
                "right" | "bottom" | "outside" => area_end - size,
                _ => area_start,
            };
        }
        area_start + self.offset_emu.map(emu_to_px).unwrap_or(0.0)
    }
}

/// Page extent and margins along one axis, px
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AxisFrame {
    pub page_extent: f64,
    pub margin_start: f64,
    pub margin_end: f64,
    pub flow_origin: f64,
}

pub(crate) fn axis_area(relative_from: &str, frame: &AxisFrame) -> (f64, f64) {
    let page_end = frame.page_extent - frame.margin_end;
    match relative_from {
        "page" => (0.0, frame.page_extent),
        "topMargin" | "leftMargin" => (0.0, frame.margin_start),
        "bottomMargin" | "rightMargin" => (page_end, frame.page_extent),
        "paragraph" | "line" | "character" => (frame.flow_origin, page_end),
        _ => (frame.margin_start, page_end),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct DrawingProps {
    floating: bool,
    /// Absolute byte offset of `wp:anchor`/`wp:inline` in the part
    offset: usize,
    cx: i64,
    cy: i64,
    embed: Option<String>,
    horizontal: AxisPosition,
    vertical: AxisPosition,
    wrap: Option<WrapMode>,
    behind_doc: bool,
    z_order: i64,
    /// 60000ths of a degree
    rotation: Option<i64>,
    textbox: bool,
    /// `wp:docPr` name and description
    description: String,
}

#[derive(Debug, Clone, PartialEq)]
enum ParsedRun {
    Text {
        text: String,
        style_key: String,
        properties: StyleProperties,
    },
    Drawing(DrawingProps),
}

#[derive(Debug, Default)]
struct ParsedParagraph {
    style_id: Option<String>,
    inline: StyleProperties,
    runs: Vec<ParsedRun>,
    page_break: bool,
}

struct OpenRun {
    depth: usize,
    rpr: Option<(usize, usize)>,
    rpr_raw: String,
    properties: StyleProperties,
    text: String,
    has_text: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum AxisValue {
    Offset,
    Align,
}

struct OpenDrawing {
    depth: usize,
    props: DrawingProps,
    axis: Option<Axis>,
    value: Option<AxisValue>,
    buffer: String,
}

/// Parser for a single paragraph span
#[derive(Default)]
struct ParagraphParser {
    base: usize,
    stack: Vec<String>,
    txbx_depth: usize,
    ppr_depth: Option<usize>,
    out: ParsedParagraph,
    run: Option<OpenRun>,
    text: Option<String>,
    drawing: Option<OpenDrawing>,
}

impl ParagraphParser {
    /// Parse the paragraph XML `xml` found at byte `base` of its part
    fn parse(xml: &str, base: usize) -> DocxResult<ParsedParagraph> {
        let mut parser = ParagraphParser {
            base,
            ..Default::default()
        };
        let mut reader = XmlParser::positional(xml);

        loop {
            let start = reader.buffer_position() as usize;
            let event = reader.read_event().map_err(DocxError::from)?;
            let end = reader.buffer_position() as usize;

            match event {
                Event::Start(ref e) => {
                    let name = XmlParser::local_name(e.name().as_ref()).to_string();
                    parser.stack.push(name.clone());
                    let depth = parser.stack.len();
                    parser.open(&name, depth, start, e, false);
                }
                Event::Empty(ref e) => {
                    let name = XmlParser::local_name(e.name().as_ref()).to_string();
                    let depth = parser.stack.len() + 1;
                    parser.open(&name, depth, start, e, true);
                    parser.close(&name, depth, end, xml, true);
                }
                Event::End(_) => {
                    let depth = parser.stack.len();
                    let name = parser.stack.pop().unwrap_or_default();
                    parser.close(&name, depth, end, xml, false);
                }
                Event::Text(ref t) => {
                    if parser.txbx_depth == 0 {
                        let text = t.unescape().map_err(DocxError::from)?;
                        if let Some(open) = parser.text.as_mut() {
                            open.push_str(&text);
                        } else if let Some(drawing) = parser.drawing.as_mut().filter(|d| d.value.is_some()) {
                            drawing.buffer.push_str(&text);
                        }
                    }
                }
                Event::CData(ref c) => {
                    if let Some(open) = parser.text.as_mut().filter(|_| parser.txbx_depth == 0) {
                        open.push_str(&String::from_utf8_lossy(c.as_ref()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(parser.out)
    }

    fn parent_is(&self, depth: usize, name: &str) -> bool {
        depth >= 2 && self.stack.get(depth - 2).map(|n| n == name).unwrap_or(false)
    }

    fn open(&mut self, name: &str, depth: usize, start: usize, e: &BytesStart, empty: bool) {
        if name == "txbxContent" {
            if let Some(drawing) = self.drawing.as_mut() {
                drawing.props.textbox = true;
            }
            if !empty {
                self.txbx_depth += 1;
            }
            return;
        }
        if self.txbx_depth > 0 {
            return;
        }

        if let Some(ppr) = self.ppr_depth {
            if depth == ppr + 1 {
                match name {
                    "pStyle" => self.out.style_id = XmlParser::get_w_attribute(e, "val"),
                    "rPr" | "sectPr" | "pPrChange" => {}
                    _ => apply_property(&mut self.out.inline, e),
                }
            }
            return;
        }

        if let Some(run) = self.run.as_mut() {
            if let Some((rpr_depth, _)) = run.rpr {
                if depth == rpr_depth + 1 {
                    apply_property(&mut run.properties, e);
                }
                return;
            }
        }

        if self.drawing.is_some() {
            self.open_drawing_child(name, depth, start, e);
            return;
        }

        match name {
            "pPr" if depth == 2 => self.ppr_depth = Some(depth),
            "r" if self.run.is_none() => {
                self.run = Some(OpenRun {
                    depth,
                    rpr: None,
                    rpr_raw: String::new(),
                    properties: StyleProperties::new(),
                    text: String::new(),
                    has_text: false,
                });
            }
            "rPr" if self.parent_is(depth, "r") => {
                if let Some(run) = self.run.as_mut().filter(|r| r.depth + 1 == depth) {
                    run.rpr = Some((depth, start));
                }
            }
            "t" if self.parent_is(depth, "r") => {
                if let Some(run) = self.run.as_mut() {
                    run.has_text = true;
                    if !empty {
                        self.text = Some(String::new());
                    }
                }
            }
            "br" => {
                if XmlParser::get_w_attribute(e, "type").as_deref() == Some("page") {
                    self.out.page_break = true;
                }
            }
            "drawing" => {
                self.drawing = Some(OpenDrawing {
                    depth,
                    props: DrawingProps::default(),
                    axis: None,
                    value: None,
                    buffer: String::new(),
                });
            }
            _ => {}
        }
    }

    fn open_drawing_child(&mut self, name: &str, depth: usize, start: usize, e: &BytesStart) {
        let base = self.base;
        let Some(drawing) = self.drawing.as_mut() else {
            return;
        };
        let props = &mut drawing.props;
        let level = depth - drawing.depth;

        match name {
            "anchor" | "inline" if level == 1 => {
                props.floating = name == "anchor";
                props.offset = base + start;
                props.behind_doc = XmlParser::get_attribute(e, b"behindDoc")
                    .map(|v| XmlParser::parse_bool(&v))
                    .unwrap_or(false);
                props.z_order = XmlParser::get_attribute(e, b"relativeHeight")
                    .and_then(|v| XmlParser::parse_i64(&v))
                    .unwrap_or(0);
            }
            "extent" if level == 2 => {
                props.cx = XmlParser::get_attribute(e, b"cx")
                    .and_then(|v| XmlParser::parse_i64(&v))
                    .unwrap_or(0);
                props.cy = XmlParser::get_attribute(e, b"cy")
                    .and_then(|v| XmlParser::parse_i64(&v))
                    .unwrap_or(0);
            }
            "docPr" if level == 2 => {
                let parts: Vec<String> = [b"name".as_slice(), b"descr".as_slice(), b"title".as_slice()]
                    .iter()
                    .filter_map(|key| XmlParser::get_attribute(e, key))
                    .collect();
                props.description = parts.join(" ");
            }
            "positionH" | "positionV" if level == 2 => {
                let axis = if name == "positionH" {
                    Axis::Horizontal
                } else {
                    Axis::Vertical
                };
                let position = match axis {
                    Axis::Horizontal => &mut props.horizontal,
                    Axis::Vertical => &mut props.vertical,
                };
                position.relative_from = XmlParser::get_attribute(e, b"relativeFrom").unwrap_or_default();
                drawing.axis = Some(axis);
            }
            "posOffset" | "align" if level == 3 && drawing.axis.is_some() => {
                drawing.value = Some(if name == "posOffset" {
                    AxisValue::Offset
                } else {
                    AxisValue::Align
                });
                drawing.buffer.clear();
            }
            "blip" if props.embed.is_none() => props.embed = XmlParser::get_r_attribute(e, "embed"),
            "xfrm" if props.rotation.is_none() => {
                props.rotation = XmlParser::get_attribute(e, b"rot").and_then(|v| XmlParser::parse_i64(&v));
            }
            _ if level == 2 && name.starts_with("wrap") => {
                props.wrap = WrapMode::from_ooxml(name, props.behind_doc);
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &str, depth: usize, end: usize, xml: &str, empty: bool) {
        if name == "txbxContent" {
            if !empty {
                self.txbx_depth = self.txbx_depth.saturating_sub(1);
            }
            return;
        }
        if self.txbx_depth > 0 {
            return;
        }

        if let Some(drawing) = self.drawing.as_mut() {
            let level = depth - drawing.depth.min(depth);
            match name {
                "posOffset" | "align" if level == 3 => {
                    let value = drawing.buffer.trim().to_string();
                    let position = match drawing.axis {
                        Some(Axis::Horizontal) => Some(&mut drawing.props.horizontal),
                        Some(Axis::Vertical) => Some(&mut drawing.props.vertical),
                        None => None,
                    };
                    if let Some(position) = position {
                        match drawing.value {
                            Some(AxisValue::Offset) => position.offset_emu = XmlParser::parse_i64(&value),
                            Some(AxisValue::Align) => position.align = Some(value),
                            None => {}
                        }
                    }
                    drawing.value = None;
                }
                "positionH" | "positionV" if level == 2 => drawing.axis = None,
                "drawing" if level == 0 => {
                    if let Some(open) = self.drawing.take() {
                        self.out.runs.push(ParsedRun::Drawing(open.props));
                    }
                }
                _ => {}
            }
            return;
        }

        match name {
            "pPr" if self.ppr_depth == Some(depth) => self.ppr_depth = None,
            "rPr" => {
                if let Some(run) = self.run.as_mut() {
                    if let Some((rpr_depth, start)) = run.rpr {
                        if rpr_depth == depth {
                            run.rpr_raw = xml[start..end].to_string();
                            run.rpr = None;
                        }
                    }
                }
            }
            "t" => {
                if let Some(text) = self.text.take() {
                    if let Some(run) = self.run.as_mut() {
                        run.text.push_str(&text);
                    }
                }
            }
            "r" => {
                if self.run.as_ref().map(|r| r.depth == depth).unwrap_or(false) {
                    if let Some(run) = self.run.take() {
                        if run.has_text {
                            self.out.runs.push(ParsedRun::Text {
                                text: run.text,
                                style_key: run_style_key(&run.rpr_raw),
                                properties: run.properties,
                            });
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> ParsedParagraph {
        ParagraphParser::parse(xml, 0).unwrap()
    }

    fn texts(parsed: &ParsedParagraph) -> Vec<String> {
        parsed
            .runs
            .iter()
            .filter_map(|r| match r {
                ParsedRun::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_runs_and_styles() {
        let parsed = parse(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/><w:jc w:val="center"/><w:rPr><w:b/></w:rPr></w:pPr><w:r><w:rPr><w:b/><w:sz w:val="28"/></w:rPr><w:t>Hallo </w:t></w:r><w:r><w:t xml:space="preserve">Welt &amp; Co</w:t></w:r></w:p>"#,
        );
        assert_eq!(parsed.style_id.as_deref(), Some("Heading1"));
        assert_eq!(parsed.inline.get("jc").map(String::as_str), Some("center"));
        assert!(!parsed.inline.contains_key("b"));
        assert_eq!(texts(&parsed), vec!["Hallo ", "Welt & Co"]);

        match &parsed.runs[0] {
            ParsedRun::Text { style_key, properties, .. } => {
                assert_eq!(style_key.len(), 16);
                assert_eq!(properties.get("sz").map(String::as_str), Some("28"));
                assert_eq!(properties.get("b").map(String::as_str), Some("1"));
            }
            other => panic!("unexpected run {:?}", other),
        }
        match &parsed.runs[1] {
            ParsedRun::Text { style_key, .. } => assert!(style_key.is_empty()),
            other => panic!("unexpected run {:?}", other),
        }
    }

    #[test]
    fn test_runs_without_text_are_skipped() {
        let parsed = parse(r#"<w:p><w:r><w:tab/></w:r><w:r><w:t/></w:r><w:r><w:br w:type="page"/></w:r></w:p>"#);
        assert_eq!(texts(&parsed), vec![""]);
        assert!(parsed.page_break);
    }

    #[test]
    fn test_textbox_text_is_excluded() {
        let parsed = parse(
            r#"<w:p><w:r><w:t>a</w:t></w:r><w:r><w:drawing><wp:anchor behindDoc="0" relativeHeight="5"><wp:extent cx="100" cy="50"/><wp:wrapNone/><a:graphic><wps:txbx><w:txbxContent><w:p><w:r><w:t>inner</w:t></w:r></w:p></w:txbxContent></wps:txbx></a:graphic></wp:anchor></w:drawing></w:r></w:p>"#,
        );
        assert_eq!(texts(&parsed), vec!["a"]);
        match &parsed.runs[1] {
            ParsedRun::Drawing(d) => {
                assert!(d.floating);
                assert!(d.textbox);
                assert_eq!(d.z_order, 5);
                assert_eq!(d.wrap, Some(WrapMode::InFrontOfText));
            }
            other => panic!("unexpected run {:?}", other),
        }
    }

    #[test]
    fn test_anchor_properties() {
        let xml = r#"<w:p><w:r><w:drawing><wp:anchor behindDoc="1" relativeHeight="3"><wp:positionH relativeFrom="page"><wp:posOffset>914400</wp:posOffset></wp:positionH><wp:positionV relativeFrom="margin"><wp:align>center</wp:align></wp:positionV><wp:extent cx="1828800" cy="914400"/><wp:wrapNone/><wp:docPr id="1" name="Unterschrift"/><a:graphic><pic:pic><pic:blipFill><a:blip r:embed="rId7"/></pic:blipFill><pic:spPr><a:xfrm rot="5400000"/></pic:spPr></pic:pic></a:graphic></wp:anchor></w:drawing></w:r></w:p>"#;
        let parsed = ParagraphParser::parse(xml, 100).unwrap();
        let ParsedRun::Drawing(d) = &parsed.runs[0] else {
            panic!("expected drawing");
        };
        assert_eq!(d.offset, 100 + xml.find("<wp:anchor").unwrap());
        assert_eq!(d.embed.as_deref(), Some("rId7"));
        assert_eq!((d.cx, d.cy), (1_828_800, 914_400));
        assert_eq!(d.horizontal.offset_emu, Some(914_400));
        assert_eq!(d.vertical.align.as_deref(), Some("center"));
        assert_eq!(d.wrap, Some(WrapMode::BehindText));
        assert_eq!(d.rotation, Some(5_400_000));
        assert!(d.description.contains("Unterschrift"));

        let frame = |extent, margin| AxisFrame {
            page_extent: extent,
            margin_start: margin,
            margin_end: margin,
            flow_origin: 0.0,
        };
        assert_eq!(d.horizontal.resolve(&frame(800.0, 50.0), 192.0), 96.0);
        assert_eq!(d.vertical.resolve(&frame(1000.0, 100.0), 96.0), 452.0);
    }

    #[test]
    fn test_parse_geometry() {
        let geometry = parse_geometry(
            r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="-1440" w:right="1800" w:bottom="1440" w:left="1800" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>"#,
        )
        .unwrap();
        assert_eq!(geometry.width_twips, 12240);
        assert_eq!(geometry.height_twips, 15840);
        assert_eq!(geometry.margin_top_twips, 1440);
        assert_eq!(geometry.margin_left_twips, 1800);
        assert_eq!(geometry.header_twips, 720);
    }
}
