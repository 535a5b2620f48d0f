//! Floating document objects (logos, signatures, stamps, shapes)
//!
//! Objects are owned by the document model, not by a page. Imported objects
//! keep the verbatim `wp:anchor` fragment they came from; export patches the
//! size and position values inside it and never regenerates it.

use crate::units::mm_to_px;
use crate::{AnchorType, AssetId, NodeId, PartKind, WrapMode};
use serde::{Deserialize, Serialize};

/// What a floating object represents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    Logo,
    Signature,
    Stamp,
    #[default]
    Image,
    Shape,
    Textbox,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Logo => "logo",
            ObjectType::Signature => "signature",
            ObjectType::Stamp => "stamp",
            ObjectType::Image => "image",
            ObjectType::Shape => "shape",
            ObjectType::Textbox => "textbox",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of an imported anchor: the n-th `wp:anchor` of a part
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorRef {
    pub xml_path: String,
    pub anchor_index: usize,
}

/// Page zone a placement rule pins an object to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlacementZone {
    Header,
    Body,
    Footer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Rule-based placement in millimetres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRule {
    pub zone: PlacementZone,
    #[serde(default)]
    pub align: HorizontalAlign,
    pub margin_x_mm: f64,
    pub margin_y_mm: f64,
    /// When set, export computes the position from the rule instead of the
    /// stored x/y
    pub lock_position: bool,
}

impl PlacementRule {
    /// Position (px) of an object of the given size on a page of the given
    /// size. Header and footer zones anchor to the page edges; the body zone
    /// keeps the current position.
    pub fn resolve_position(
        &self,
        page_width_px: f64,
        page_height_px: f64,
        size_px: (f64, f64),
        current_px: (f64, f64),
    ) -> (f64, f64) {
        let (width, height) = size_px;
        let margin_x = mm_to_px(self.margin_x_mm);
        let margin_y = mm_to_px(self.margin_y_mm);

        let x = match self.align {
            HorizontalAlign::Left => margin_x,
            HorizontalAlign::Center => (page_width_px - width) / 2.0,
            HorizontalAlign::Right => page_width_px - width - margin_x,
        };

        match self.zone {
            PlacementZone::Header => (x, margin_y),
            PlacementZone::Footer => (x, page_height_px - height - margin_y),
            PlacementZone::Body => current_px,
        }
    }
}

/// A floating object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentObject {
    pub id: NodeId,
    pub object_type: ObjectType,
    /// Absent for shapes and text boxes that carry no picture
    pub asset_id: Option<AssetId>,
    pub x_px: f64,
    pub y_px: f64,
    pub width_px: f64,
    pub height_px: f64,
    #[serde(default)]
    pub rotation_deg: f64,
    pub page_number: u32,
    pub anchor: AnchorType,
    pub wrap: WrapMode,
    #[serde(default)]
    pub z_order: i64,
    #[serde(default)]
    pub placement_rule: Option<PlacementRule>,
    /// Advisory confidence of the classification, 0..=1
    pub classification_confidence: f64,
    #[serde(default)]
    pub classification_reasons: Vec<String>,
    /// Confidence fell below the advisory threshold
    #[serde(default)]
    pub ambiguous: bool,
    /// Verbatim positioning fragment from the source part
    #[serde(default)]
    pub raw_xml: String,
    /// Where the fragment came from; `None` for inserted objects
    #[serde(default)]
    pub source: Option<AnchorRef>,
    /// Page position (px) the fragment's `wp:posOffset` values are measured
    /// from
    #[serde(default)]
    pub origin_x_px: f64,
    #[serde(default)]
    pub origin_y_px: f64,
    #[serde(default)]
    pub local_version: u64,
}

impl DocumentObject {
    pub fn new(object_type: ObjectType, asset_id: Option<AssetId>) -> Self {
        Self {
            id: NodeId::new(),
            object_type,
            asset_id,
            x_px: 0.0,
            y_px: 0.0,
            width_px: 0.0,
            height_px: 0.0,
            rotation_deg: 0.0,
            page_number: 1,
            anchor: AnchorType::Floating,
            wrap: WrapMode::InFrontOfText,
            z_order: 0,
            placement_rule: None,
            classification_confidence: 1.0,
            classification_reasons: Vec::new(),
            ambiguous: false,
            raw_xml: String::new(),
            source: None,
            origin_x_px: 0.0,
            origin_y_px: 0.0,
            local_version: 0,
        }
    }

    pub fn is_changed(&self) -> bool {
        self.local_version > 0
    }

    pub fn part_kind(&self) -> PartKind {
        self.source
            .as_ref()
            .map(|s| PartKind::from_xml_path(&s.xml_path))
            .unwrap_or(PartKind::Body)
    }

    pub fn is_signature_or_stamp(&self) -> bool {
        matches!(self.object_type, ObjectType::Signature | ObjectType::Stamp)
    }

    /// Vertical centre in page pixels
    pub fn center_y(&self) -> f64 {
        self.y_px + self.height_px / 2.0
    }
}

/// Partial update of an object's non-geometric properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPatch {
    pub object_type: Option<ObjectType>,
    pub rotation_deg: Option<f64>,
    pub wrap: Option<WrapMode>,
    pub z_order: Option<i64>,
    pub page_number: Option<u32>,
    /// `Some(None)` clears the rule
    #[serde(default, with = "double_option")]
    pub placement_rule: Option<Option<PlacementRule>>,
}

impl ObjectPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, object: &mut DocumentObject) {
        if let Some(object_type) = self.object_type {
            object.object_type = object_type;
            // A manual reclassification is authoritative
            object.classification_confidence = 1.0;
            object.ambiguous = false;
        }
        if let Some(rotation) = self.rotation_deg {
            object.rotation_deg = rotation;
        }
        if let Some(wrap) = self.wrap {
            object.wrap = wrap;
        }
        if let Some(z_order) = self.z_order {
            object.z_order = z_order;
        }
        if let Some(page_number) = self.page_number {
            object.page_number = page_number;
        }
        if let Some(rule) = &self.placement_rule {
            object.placement_rule = rule.clone();
        }
    }
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T: Serialize, S: Serializer>(
        value: &Option<Option<T>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            None => serializer.serialize_none(),
            Some(inner) => inner.serialize(serializer),
        }
    }

    pub fn deserialize<'de, T: Deserialize<'de>, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Option<T>>, D::Error> {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
