//! Image placement types shared by inline image runs and floating objects

use serde::{Deserialize, Serialize};

/// Whether a drawing flows with text or floats over the page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnchorType {
    /// `wp:inline`: treated as a character in the text flow
    #[default]
    Inline,
    /// `wp:anchor`: positioned relative to page, margin or paragraph
    Floating,
}

/// How text wraps around a drawing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WrapMode {
    #[default]
    Inline,
    Square,
    Tight,
    Through,
    TopAndBottom,
    BehindText,
    InFrontOfText,
}

impl WrapMode {
    /// Map a `wp:wrap*` element name to a wrap mode. `wrapNone` depends on
    /// the anchor's `behindDoc` flag.
    pub fn from_ooxml(local_name: &str, behind_doc: bool) -> Option<Self> {
        match local_name {
            "wrapSquare" => Some(Self::Square),
            "wrapTight" => Some(Self::Tight),
            "wrapThrough" => Some(Self::Through),
            "wrapTopAndBottom" => Some(Self::TopAndBottom),
            "wrapNone" if behind_doc => Some(Self::BehindText),
            "wrapNone" => Some(Self::InFrontOfText),
            _ => None,
        }
    }
}

/// A position in EMUs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmuPoint {
    pub x: i64,
    pub y: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_none_depends_on_behind_doc() {
        assert_eq!(WrapMode::from_ooxml("wrapNone", true), Some(WrapMode::BehindText));
        assert_eq!(WrapMode::from_ooxml("wrapNone", false), Some(WrapMode::InFrontOfText));
        assert_eq!(WrapMode::from_ooxml("wrapSquare", false), Some(WrapMode::Square));
        assert_eq!(WrapMode::from_ooxml("extent", false), None);
    }
}
