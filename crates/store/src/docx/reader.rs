//! ZIP archive reading and XML parsing utilities

use crate::docx::error::{DocxError, DocxResult};
use quick_xml::events::BytesStart;
use quick_xml::Reader;
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

/// A wrapper around a ZIP archive for reading DOCX files
pub struct DocxReader<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<'a> DocxReader<Cursor<&'a [u8]>> {
    /// Open an in-memory DOCX binary
    pub fn from_bytes(bytes: &'a [u8]) -> DocxResult<Self> {
        Self::new(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> DocxReader<R> {
    /// Create a new DOCX reader from a source that implements Read + Seek
    pub fn new(reader: R) -> DocxResult<Self> {
        let archive = ZipArchive::new(reader)?;
        Ok(Self { archive })
    }

    /// Read a file from the archive as a string
    pub fn read_file_as_string(&mut self, path: &str) -> DocxResult<String> {
        let bytes = self.read_file_as_bytes(path)?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Read a file from the archive as bytes
    pub fn read_file_as_bytes(&mut self, path: &str) -> DocxResult<Vec<u8>> {
        let mut file = self.archive.by_name(path).map_err(|e| {
            if matches!(e, zip::result::ZipError::FileNotFound) {
                DocxError::MissingPart(path.to_string())
            } else {
                DocxError::from(e)
            }
        })?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        Ok(contents)
    }

    /// Read a file if it exists
    pub fn read_optional_string(&mut self, path: &str) -> DocxResult<Option<String>> {
        if !self.file_exists(path) {
            return Ok(None);
        }
        self.read_file_as_string(path).map(Some)
    }

    /// Check if a file exists in the archive
    pub fn file_exists(&self, path: &str) -> bool {
        self.archive.index_for_name(path).is_some()
    }

    /// All entry names in archive order
    pub fn file_names(&self) -> Vec<String> {
        (0..self.archive.len())
            .filter_map(|i| self.archive.name_for_index(i).map(str::to_string))
            .collect()
    }

    /// Header and footer parts in natural order (`header2` before `header10`)
    pub fn header_footer_parts(&self) -> Vec<String> {
        let mut parts: Vec<String> = self
            .file_names()
            .into_iter()
            .filter(|name| {
                let kind = doc_model::PartKind::from_xml_path(name);
                name.starts_with("word/")
                    && name.ends_with(".xml")
                    && !name[5..].contains('/')
                    && kind.is_header_or_footer()
            })
            .collect();
        parts.sort_by_key(|name| natural_part_key(name));
        parts
    }
}

/// Headers before footers, then by numeric suffix
fn natural_part_key(name: &str) -> (u8, u32, String) {
    let file = name.rsplit('/').next().unwrap_or(name);
    let stem = file.trim_end_matches(".xml");
    let (rank, digits) = if let Some(rest) = stem.strip_prefix("header") {
        (0, rest)
    } else if let Some(rest) = stem.strip_prefix("footer") {
        (1, rest)
    } else {
        (2, stem)
    };
    (rank, digits.parse().unwrap_or(0), name.to_string())
}

/// XML reader utilities for parsing DOCX XML content
pub struct XmlParser;

impl XmlParser {
    /// Reader for catalogue-like parts where whitespace is irrelevant
    pub fn from_string(content: &str) -> Reader<&[u8]> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);
        reader
    }

    /// Reader that keeps every byte accounted for, so event positions map
    /// exactly onto the source text. A byte order mark must be skipped by
    /// the caller.
    pub fn positional(content: &str) -> Reader<&[u8]> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(false);
        reader
    }

    /// Get an attribute value from an event
    pub fn get_attribute(event: &BytesStart, name: &[u8]) -> Option<String> {
        event
            .attributes()
            .filter_map(|a| a.ok())
            .find(|a| a.key.as_ref() == name)
            .map(|a| String::from_utf8_lossy(&a.value).to_string())
    }

    /// Get a w: namespaced attribute (most common in DOCX)
    pub fn get_w_attribute(event: &BytesStart, name: &str) -> Option<String> {
        let key = format!("w:{}", name);
        Self::get_attribute(event, key.as_bytes()).or_else(|| Self::get_attribute(event, name.as_bytes()))
    }

    /// Get a r: namespaced attribute
    pub fn get_r_attribute(event: &BytesStart, name: &str) -> Option<String> {
        let key = format!("r:{}", name);
        Self::get_attribute(event, key.as_bytes())
    }

    /// Attributes with their namespace prefixes removed
    pub fn local_attributes(event: &BytesStart) -> Vec<(String, String)> {
        event
            .attributes()
            .filter_map(|a| a.ok())
            .filter(|a| !a.key.as_ref().starts_with(b"xmlns"))
            .map(|a| {
                let key = String::from_utf8_lossy(a.key.local_name().as_ref()).to_string();
                let value = String::from_utf8_lossy(&a.value).to_string();
                (key, value)
            })
            .collect()
    }

    /// Parse a boolean value (0/1, true/false, on/off)
    pub fn parse_bool(value: &str) -> bool {
        matches!(value.to_lowercase().as_str(), "1" | "true" | "on" | "yes")
    }

    /// Parse an integer EMU/twip value
    pub fn parse_i64(value: &str) -> Option<i64> {
        value.trim().parse().ok()
    }

    /// Element name without its namespace prefix
    pub fn local_name(name: &[u8]) -> &str {
        let name_str = std::str::from_utf8(name).unwrap_or("");
        name_str.rsplit(':').next().unwrap_or(name_str)
    }

    /// Check if an element name matches with optional namespace prefix
    pub fn matches_element(name: &[u8], expected: &str) -> bool {
        Self::local_name(name) == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(XmlParser::parse_bool("1"));
        assert!(XmlParser::parse_bool("true"));
        assert!(XmlParser::parse_bool("on"));
        assert!(!XmlParser::parse_bool("0"));
        assert!(!XmlParser::parse_bool("false"));
    }

    #[test]
    fn test_matches_element() {
        assert!(XmlParser::matches_element(b"p", "p"));
        assert!(XmlParser::matches_element(b"w:p", "p"));
        assert!(!XmlParser::matches_element(b"w:r", "p"));
        assert!(!XmlParser::matches_element(b"w:pPr", "p"));
    }

    #[test]
    fn test_natural_part_order() {
        let mut names = vec![
            "word/footer1.xml".to_string(),
            "word/header10.xml".to_string(),
            "word/header2.xml".to_string(),
        ];
        names.sort_by_key(|n| natural_part_key(n));
        assert_eq!(
            names,
            vec!["word/header2.xml", "word/header10.xml", "word/footer1.xml"]
        );
    }
}
