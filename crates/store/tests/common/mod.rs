//! In-memory DOCX fixtures

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const NAMESPACES: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture""#,
);

/// A4 portrait, 1 inch margins
pub const SECTION: &str = r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr>"#;

/// 1x1 transparent PNG
pub const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

pub fn run(text: &str) -> String {
    format!(r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#, text)
}

pub fn bold_run(text: &str) -> String {
    format!(r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#, text)
}

pub fn paragraph(runs: &[String]) -> String {
    format!("<w:p>{}</w:p>", runs.concat())
}

pub fn heading(text: &str) -> String {
    format!(r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr>{}</w:p>"#, run(text))
}

pub fn table(cells: &[&[&str]]) -> String {
    let rows: String = cells
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|text| format!("<w:tc>{}</w:tc>", paragraph(&[run(text)])))
                .collect();
            format!("<w:tr>{}</w:tr>", cells)
        })
        .collect();
    format!(r#"<w:tbl><w:tblPr/>{}</w:tbl>"#, rows)
}

/// Floating picture anchored relative to the page
pub fn anchored_picture(embed: &str, name: &str, x_emu: i64, y_emu: i64, cx: i64, cy: i64) -> String {
    format!(
        concat!(
            r#"<w:r><w:drawing><wp:anchor behindDoc="0" relativeHeight="2" distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:simplePos x="0" y="0"/>"#,
            r#"<wp:positionH relativeFrom="page"><wp:posOffset>{x}</wp:posOffset></wp:positionH>"#,
            r#"<wp:positionV relativeFrom="page"><wp:posOffset>{y}</wp:posOffset></wp:positionV>"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/><wp:wrapNone/><wp:docPr id="1" name="{name}"/>"#,
            r#"<a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="{embed}"/></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm></pic:spPr></pic:pic></a:graphicData></a:graphic>"#,
            r#"</wp:anchor></w:drawing></w:r>"#,
        ),
        x = x_emu,
        y = y_emu,
        cx = cx,
        cy = cy,
        name = name,
        embed = embed,
    )
}

pub fn inline_picture(embed: &str, cx: i64, cy: i64) -> String {
    format!(
        r#"<w:r><w:drawing><wp:inline><wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="2" name="Bild"/><a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="{embed}"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#,
        cx = cx,
        cy = cy,
        embed = embed,
    )
}

pub fn part_xml(root: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:{root} {ns}>{body}</w:{root}>"#,
        root = root,
        ns = NAMESPACES,
        body = body,
    )
}

/// Builds a minimal DOCX archive
#[derive(Debug, Default)]
pub struct DocxBuilder {
    body: String,
    headers: Vec<String>,
    footers: Vec<String>,
    document_rels: Vec<(String, String)>,
    media: Vec<(String, Vec<u8>)>,
    styles: Option<String>,
    bom: bool,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, xml: impl Into<String>) -> Self {
        self.body.push_str(&xml.into());
        self
    }

    pub fn header(mut self, xml: impl Into<String>) -> Self {
        self.headers.push(xml.into());
        self
    }

    pub fn footer(mut self, xml: impl Into<String>) -> Self {
        self.footers.push(xml.into());
        self
    }

    /// Image relationship of the main document
    pub fn image_rel(mut self, id: &str, target: &str) -> Self {
        self.document_rels.push((id.to_string(), target.to_string()));
        self
    }

    pub fn media(mut self, name: &str, data: &[u8]) -> Self {
        self.media.push((format!("word/media/{}", name), data.to_vec()));
        self
    }

    /// Media entry at an arbitrary archive path
    pub fn media_at(mut self, path: &str, data: &[u8]) -> Self {
        self.media.push((path.to_string(), data.to_vec()));
        self
    }

    /// Prefix the main document part with a UTF-8 byte order mark
    pub fn with_bom(mut self) -> Self {
        self.bom = true;
        self
    }

    pub fn styles(mut self, xml: impl Into<String>) -> Self {
        self.styles = Some(xml.into());
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut add = |name: &str, data: &[u8]| {
            zip.start_file(name, options).unwrap();
            zip.write_all(data).unwrap();
        };

        let mut overrides = String::new();
        for i in 1..=self.headers.len() {
            overrides.push_str(&format!(
                r#"<Override PartName="/word/header{}.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/>"#,
                i
            ));
        }
        for i in 1..=self.footers.len() {
            overrides.push_str(&format!(
                r#"<Override PartName="/word/footer{}.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml"/>"#,
                i
            ));
        }
        add(
            "[Content_Types].xml",
            format!(
                concat!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
                    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
                    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
                    r#"<Default Extension="png" ContentType="image/png"/>"#,
                    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
                    "{}</Types>"
                ),
                overrides
            )
            .as_bytes(),
        );

        let rels: String = self
            .document_rels
            .iter()
            .map(|(id, target)| {
                format!(
                    r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="{}"/>"#,
                    id, target
                )
            })
            .collect();
        add(
            "word/_rels/document.xml.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
                rels
            )
            .as_bytes(),
        );

        let mut document = part_xml("document", &format!("<w:body>{}{}</w:body>", self.body, SECTION));
        if self.bom {
            document.insert(0, '\u{feff}');
        }
        add("word/document.xml", document.as_bytes());
        for (i, header) in self.headers.iter().enumerate() {
            add(&format!("word/header{}.xml", i + 1), part_xml("hdr", header).as_bytes());
        }
        for (i, footer) in self.footers.iter().enumerate() {
            add(&format!("word/footer{}.xml", i + 1), part_xml("ftr", footer).as_bytes());
        }
        if let Some(styles) = &self.styles {
            add("word/styles.xml", styles.as_bytes());
        }
        for (name, data) in &self.media {
            add(name, data);
        }

        zip.finish().unwrap().into_inner()
    }
}

pub fn read_part(docx: &[u8], name: &str) -> String {
    use std::io::Read;
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut xml = String::new();
    file.read_to_string(&mut xml).unwrap();
    xml
}

pub const HEADING_STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/>"#,
    r#"<w:pPr><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:sz w:val="32"/></w:rPr></w:style>"#,
    r#"</w:styles>"#,
);
