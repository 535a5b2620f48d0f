//! Content parts of the container

use serde::{Deserialize, Serialize};

/// Path of the main document part
pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";

/// Which kind of content part a block or object lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PartKind {
    Body,
    Header,
    Footer,
}

impl PartKind {
    /// Classify a part path such as `word/header2.xml`
    pub fn from_xml_path(path: &str) -> Self {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        if file_name.starts_with("header") {
            Self::Header
        } else if file_name.starts_with("footer") {
            Self::Footer
        } else {
            Self::Body
        }
    }

    pub fn is_header_or_footer(&self) -> bool {
        matches!(self, Self::Header | Self::Footer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_kind_from_path() {
        assert_eq!(PartKind::from_xml_path(MAIN_DOCUMENT_PART), PartKind::Body);
        assert_eq!(PartKind::from_xml_path("word/header1.xml"), PartKind::Header);
        assert_eq!(PartKind::from_xml_path("word/footer3.xml"), PartKind::Footer);
        assert!(PartKind::Footer.is_header_or_footer());
    }
}
