//! Positional index of a content part
//!
//! One streaming pass over a part records the byte spans of its top-level
//! paragraphs and tables, every `w:t` text node and run inside them, the
//! body `w:sectPr` and every floating `wp:anchor` drawing. Importer and
//! exporter both address content through this index, so a `nodeIndex`
//! assigned at import time always lands on the same element at export time.
//!
//! Text inside text boxes (`w:txbxContent`) is not part of the surrounding
//! paragraph. Paragraphs of nested tables are not addressed.

use crate::docx::error::{DocxError, DocxResult};
use crate::docx::reader::XmlParser;
use quick_xml::events::{BytesStart, Event};

/// Byte range into the part XML
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn slice<'a>(&self, xml: &'a str) -> &'a str {
        &xml[self.start..self.end]
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A `w:t` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    /// Whole element, tags included
    pub element: Span,
    pub start_tag: Span,
    /// Escaped content between the tags; empty at the tag end when
    /// self-closing
    pub content: Span,
    /// Unescaped text
    pub text: String,
    pub self_closing: bool,
    /// Carries `xml:space="preserve"`
    pub preserve: bool,
}

impl TextNode {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphSpan {
    pub span: Span,
    pub text_nodes: Vec<TextNode>,
    /// `w:r` elements outside text boxes
    pub run_count: usize,
}

impl ParagraphSpan {
    pub fn text(&self) -> String {
        self.text_nodes.iter().map(|t| t.text.as_str()).collect()
    }
}

/// Rows of cells of paragraphs
pub type CellGrid = Vec<Vec<Vec<ParagraphSpan>>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSpan {
    pub span: Span,
    pub rows: CellGrid,
    /// `w:tblPr`, replayed verbatim
    pub properties: Option<Span>,
}

impl TableSpan {
    pub fn paragraph(&self, row: usize, cell: usize, paragraph: usize) -> Option<&ParagraphSpan> {
        self.rows.get(row)?.get(cell)?.get(paragraph)
    }
}

/// A `w:drawing` holding a `wp:anchor`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorSpan {
    pub drawing: Span,
    pub anchor: Span,
}

/// Top-level children of the part container in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevel {
    /// Index into [`PartIndex::paragraphs`]
    Paragraph(usize),
    /// Index into [`PartIndex::tables`]
    Table(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartIndex {
    pub paragraphs: Vec<ParagraphSpan>,
    pub tables: Vec<TableSpan>,
    pub order: Vec<TopLevel>,
    pub anchors: Vec<AnchorSpan>,
    /// Body-level `w:sectPr`
    pub section_properties: Option<Span>,
}

impl PartIndex {
    /// Per-part ordinal of the anchor starting at `offset`
    pub fn anchor_at(&self, offset: usize) -> Option<usize> {
        self.anchors.iter().position(|a| a.anchor.start == offset)
    }
}

/// Byte length of a leading UTF-8 byte order mark
pub fn bom_len(xml: &str) -> usize {
    if xml.starts_with('\u{feff}') {
        '\u{feff}'.len_utf8()
    } else {
        0
    }
}

/// Build the index of one part. Spans count from the first byte of `xml`,
/// including a leading byte order mark.
pub fn index_part(xml: &str) -> DocxResult<PartIndex> {
    let skip = bom_len(xml);
    let mut reader = XmlParser::positional(&xml[skip..]);
    let mut indexer = Indexer::default();

    loop {
        let start = skip + reader.buffer_position() as usize;
        let event = reader.read_event().map_err(DocxError::from)?;
        let span = Span::new(start, skip + reader.buffer_position() as usize);

        match event {
            Event::Start(ref e) => {
                let name = XmlParser::local_name(e.name().as_ref()).to_string();
                indexer.stack.push(name.clone());
                let depth = indexer.stack.len();
                indexer.open(&name, depth, span, e, false);
            }
            Event::Empty(ref e) => {
                let name = XmlParser::local_name(e.name().as_ref()).to_string();
                let depth = indexer.stack.len() + 1;
                indexer.open(&name, depth, span, e, true);
                indexer.close(&name, depth, span);
            }
            Event::End(_) => {
                let depth = indexer.stack.len();
                let name = indexer.stack.pop().unwrap_or_default();
                indexer.close(&name, depth, span);
            }
            Event::Text(ref t) => {
                if let Some(open) = indexer.text.as_mut() {
                    let text = t.unescape().map_err(DocxError::from)?;
                    open.text.push_str(&text);
                }
            }
            Event::CData(ref c) => {
                if let Some(open) = indexer.text.as_mut() {
                    open.text.push_str(&String::from_utf8_lossy(c.as_ref()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(indexer.index)
}

enum ParagraphTarget {
    TopLevel,
    Cell,
}

struct OpenParagraph {
    start: usize,
    depth: usize,
    target: ParagraphTarget,
    text_nodes: Vec<TextNode>,
    run_count: usize,
}

struct OpenText {
    start_tag: Span,
    preserve: bool,
    text: String,
}

struct OpenTable {
    start: usize,
    depth: usize,
    rows: CellGrid,
    properties_start: Option<usize>,
    properties: Option<Span>,
}

struct OpenDrawing {
    start: usize,
    depth: usize,
    anchor_start: Option<usize>,
    anchor: Option<Span>,
}

#[derive(Default)]
struct Indexer {
    index: PartIndex,
    stack: Vec<String>,
    container: Option<usize>,
    txbx_depth: usize,
    paragraph: Option<OpenParagraph>,
    text: Option<OpenText>,
    table: Option<OpenTable>,
    drawings: Vec<OpenDrawing>,
    section_start: Option<usize>,
}

impl Indexer {
    fn is_top_level(&self, depth: usize) -> bool {
        self.container.map(|c| depth == c + 1).unwrap_or(false)
    }

    fn parent_is(&self, depth: usize, name: &str) -> bool {
        depth >= 2 && self.stack.get(depth - 2).map(|n| n == name).unwrap_or(false)
    }

    fn open(&mut self, name: &str, depth: usize, span: Span, e: &BytesStart, empty: bool) {
        match name {
            "txbxContent" => {
                if !empty {
                    self.txbx_depth += 1;
                }
            }
            "body" | "hdr" | "ftr" if self.container.is_none() => self.container = Some(depth),
            "p" if self.txbx_depth == 0 => {
                if self.is_top_level(depth) {
                    self.start_paragraph(span.start, depth, ParagraphTarget::TopLevel);
                } else if let Some(table) = &self.table {
                    if depth == table.depth + 3 && self.parent_is(depth, "tc") {
                        self.start_paragraph(span.start, depth, ParagraphTarget::Cell);
                    }
                }
            }
            "tbl" if self.txbx_depth == 0 && self.is_top_level(depth) => {
                self.table = Some(OpenTable {
                    start: span.start,
                    depth,
                    rows: Vec::new(),
                    properties_start: None,
                    properties: None,
                });
            }
            "tblPr" => {
                if let Some(table) = self.table.as_mut().filter(|t| depth == t.depth + 1) {
                    table.properties_start = Some(span.start);
                }
            }
            "tr" => {
                if let Some(table) = self.table.as_mut().filter(|t| depth == t.depth + 1) {
                    table.rows.push(Vec::new());
                }
            }
            "tc" => {
                if let Some(table) = self.table.as_mut().filter(|t| depth == t.depth + 2) {
                    if let Some(row) = table.rows.last_mut() {
                        row.push(Vec::new());
                    }
                }
            }
            "sectPr" if self.is_top_level(depth) => self.section_start = Some(span.start),
            "r" if self.txbx_depth == 0 => {
                if let Some(paragraph) = self.paragraph.as_mut() {
                    paragraph.run_count += 1;
                }
            }
            "t" if self.txbx_depth == 0 && self.paragraph.is_some() && self.parent_is(depth, "r") => {
                let preserve = XmlParser::get_attribute(e, b"xml:space")
                    .map(|v| v == "preserve")
                    .unwrap_or(false);
                if empty {
                    if let Some(paragraph) = self.paragraph.as_mut() {
                        paragraph.text_nodes.push(TextNode {
                            element: span,
                            start_tag: span,
                            content: Span::new(span.end, span.end),
                            text: String::new(),
                            self_closing: true,
                            preserve,
                        });
                    }
                } else {
                    self.text = Some(OpenText {
                        start_tag: span,
                        preserve,
                        text: String::new(),
                    });
                }
            }
            "drawing" => self.drawings.push(OpenDrawing {
                start: span.start,
                depth,
                anchor_start: None,
                anchor: None,
            }),
            "anchor" => {
                if let Some(drawing) = self.drawings.last_mut().filter(|d| depth == d.depth + 1) {
                    drawing.anchor_start = Some(span.start);
                    if empty {
                        drawing.anchor = Some(span);
                    }
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &str, depth: usize, span: Span) {
        match name {
            "txbxContent" => self.txbx_depth = self.txbx_depth.saturating_sub(1),
            "t" => {
                if let Some(open) = self.text.take() {
                    if let Some(paragraph) = self.paragraph.as_mut() {
                        paragraph.text_nodes.push(TextNode {
                            element: Span::new(open.start_tag.start, span.end),
                            start_tag: open.start_tag,
                            content: Span::new(open.start_tag.end, span.start),
                            text: open.text,
                            self_closing: false,
                            preserve: open.preserve,
                        });
                    }
                }
            }
            "p" => {
                if self.paragraph.as_ref().map(|p| p.depth == depth).unwrap_or(false) {
                    if let Some(open) = self.paragraph.take() {
                        self.finish_paragraph(open, span.end);
                    }
                }
            }
            "tblPr" => {
                if let Some(table) = self.table.as_mut().filter(|t| depth == t.depth + 1) {
                    if let Some(start) = table.properties_start.take() {
                        table.properties = Some(Span::new(start, span.end));
                    }
                }
            }
            "tbl" => {
                if self.table.as_ref().map(|t| t.depth == depth).unwrap_or(false) {
                    if let Some(open) = self.table.take() {
                        self.index.order.push(TopLevel::Table(self.index.tables.len()));
                        self.index.tables.push(TableSpan {
                            span: Span::new(open.start, span.end),
                            rows: open.rows,
                            properties: open.properties,
                        });
                    }
                }
            }
            "sectPr" if self.is_top_level(depth) => {
                if let Some(start) = self.section_start.take() {
                    self.index.section_properties = Some(Span::new(start, span.end));
                }
            }
            "anchor" => {
                if let Some(drawing) = self.drawings.last_mut().filter(|d| depth == d.depth + 1) {
                    if let Some(start) = drawing.anchor_start {
                        drawing.anchor = Some(Span::new(start, span.end));
                    }
                }
            }
            "drawing" => {
                if self.drawings.last().map(|d| d.depth == depth).unwrap_or(false) {
                    if let Some(drawing) = self.drawings.pop() {
                        if let Some(anchor) = drawing.anchor {
                            self.index.anchors.push(AnchorSpan {
                                drawing: Span::new(drawing.start, span.end),
                                anchor,
                            });
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn start_paragraph(&mut self, start: usize, depth: usize, target: ParagraphTarget) {
        self.paragraph = Some(OpenParagraph {
            start,
            depth,
            target,
            text_nodes: Vec::new(),
            run_count: 0,
        });
    }

    fn finish_paragraph(&mut self, open: OpenParagraph, end: usize) {
        let paragraph = ParagraphSpan {
            span: Span::new(open.start, end),
            text_nodes: open.text_nodes,
            run_count: open.run_count,
        };
        match open.target {
            ParagraphTarget::TopLevel => {
                self.index
                    .order
                    .push(TopLevel::Paragraph(self.index.paragraphs.len()));
                self.index.paragraphs.push(paragraph);
            }
            ParagraphTarget::Cell => {
                if let Some(cell) = self
                    .table
                    .as_mut()
                    .and_then(|t| t.rows.last_mut())
                    .and_then(|r| r.last_mut())
                {
                    cell.push(paragraph);
                }
            }
        }
    }
}

/// A replacement of one byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub span: Span,
    pub replacement: String,
}

impl Splice {
    pub fn new(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }
}

/// Apply non-overlapping splices. Bytes outside the spans are copied
/// unchanged.
pub fn apply_splices(xml: &str, mut splices: Vec<Splice>) -> DocxResult<String> {
    splices.sort_by_key(|s| (s.span.start, s.span.end));
    for pair in splices.windows(2) {
        if pair[0].span.end > pair[1].span.start {
            return Err(DocxError::InvalidStructure(format!(
                "overlapping patches at {}..{} and {}..{}",
                pair[0].span.start, pair[0].span.end, pair[1].span.start, pair[1].span.end
            )));
        }
    }

    let mut out = String::with_capacity(xml.len());
    let mut cursor = 0;
    for splice in &splices {
        out.push_str(&xml[cursor..splice.span.start]);
        out.push_str(&splice.replacement);
        cursor = splice.span.end;
    }
    out.push_str(&xml[cursor..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<w:document xmlns:w="w" xmlns:wp="wp"><w:body>"#,
        r#"<w:p><w:r><w:t>Hello </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">big &amp; </w:t></w:r><w:r><w:t/></w:r></w:p>"#,
        r#"<w:p/>"#,
        r#"<w:tbl><w:tblPr><w:tblW w:w="0"/></w:tblPr><w:tr><w:tc><w:p><w:r><w:t>A1</w:t></w:r></w:p><w:p/></w:tc><w:tc><w:p><w:r><w:t>B1</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        r#"<w:p><w:r><w:drawing><wp:anchor behindDoc="0"><wp:extent cx="1" cy="2"/></wp:anchor></w:drawing></w:r>"#,
        r#"<w:r><w:pict><w:txbxContent><w:p><w:r><w:t>boxed</w:t></w:r></w:p></w:txbxContent></w:pict></w:r></w:p>"#,
        r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#,
        r#"</w:body></w:document>"#
    );

    #[test]
    fn test_top_level_order_and_counts() {
        let index = index_part(DOC).unwrap();
        assert_eq!(index.paragraphs.len(), 3);
        assert_eq!(index.tables.len(), 1);
        assert_eq!(
            index.order,
            vec![
                TopLevel::Paragraph(0),
                TopLevel::Paragraph(1),
                TopLevel::Table(0),
                TopLevel::Paragraph(2)
            ]
        );
        assert!(index.section_properties.unwrap().slice(DOC).contains("pgSz"));
    }

    #[test]
    fn test_text_nodes() {
        let index = index_part(DOC).unwrap();
        let first = &index.paragraphs[0];
        assert_eq!(first.run_count, 3);
        assert_eq!(first.text_nodes.len(), 3);
        assert_eq!(first.text(), "Hello big & ");
        assert_eq!(first.text_nodes[1].content.slice(DOC), "big &amp; ");
        assert!(first.text_nodes[1].preserve);
        assert!(first.text_nodes[2].self_closing);
        assert_eq!(first.text_nodes[2].element.slice(DOC), "<w:t/>");
        assert!(first.span.slice(DOC).starts_with("<w:p>"));
        assert!(first.span.slice(DOC).ends_with("</w:p>"));

        assert_eq!(index.paragraphs[1].span.slice(DOC), "<w:p/>");
    }

    #[test]
    fn test_table_cells() {
        let index = index_part(DOC).unwrap();
        let table = &index.tables[0];
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].len(), 2);
        assert_eq!(table.rows[0][0].len(), 2);
        assert_eq!(table.paragraph(0, 1, 0).unwrap().text(), "B1");
        assert_eq!(
            table.properties.unwrap().slice(DOC),
            r#"<w:tblPr><w:tblW w:w="0"/></w:tblPr>"#
        );
    }

    #[test]
    fn test_text_box_content_excluded_and_anchor_found() {
        let index = index_part(DOC).unwrap();
        let last = &index.paragraphs[2];
        assert_eq!(last.text(), "");
        assert_eq!(last.run_count, 2);
        assert_eq!(index.anchors.len(), 1);
        assert!(index.anchors[0].anchor.slice(DOC).starts_with("<wp:anchor"));
        assert!(index.anchors[0].drawing.slice(DOC).ends_with("</w:drawing>"));
        assert_eq!(index.anchor_at(index.anchors[0].anchor.start), Some(0));
    }

    #[test]
    fn test_spans_account_for_byte_order_mark() {
        let xml = format!("\u{feff}{}", DOC);
        assert_eq!(bom_len(&xml), 3);
        let index = index_part(&xml).unwrap();
        let first = &index.paragraphs[0];
        assert_eq!(first.text(), "Hello big & ");
        assert_eq!(first.text_nodes[1].content.slice(&xml), "big &amp; ");
        assert!(first.span.slice(&xml).starts_with("<w:p>"));
        assert_eq!(index.paragraphs[1].span.slice(&xml), "<w:p/>");
    }

    #[test]
    fn test_apply_splices() {
        let xml = "0123456789";
        let out = apply_splices(
            xml,
            vec![Splice::new(Span::new(6, 8), "X"), Splice::new(Span::new(1, 2), "ab")],
        )
        .unwrap();
        assert_eq!(out, "0ab2345X89");
        assert!(apply_splices(
            xml,
            vec![Splice::new(Span::new(1, 5), ""), Splice::new(Span::new(4, 6), "")]
        )
        .is_err());
    }
}
