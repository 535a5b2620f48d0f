//! Heuristic classification of floating images
//!
//! An additive scorer: every matching signal adds points to logo, signature
//! or stamp. The best score wins (ties resolve logo, then signature, then
//! stamp), confidence is the score over a per-category normaliser, and a
//! zero score means a plain image. The result is advisory only.

use doc_model::units::emu_to_mm;
use doc_model::{ObjectType, PartKind};
use serde::{Deserialize, Serialize};

/// Inclusive numeric range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Scores and thresholds of the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifierConfig {
    /// Image sits in a header part
    pub header_logo_score: f64,
    /// Width/height ratio typical for logos
    pub logo_aspect: Band,
    pub logo_aspect_score: f64,
    /// Minimum width/height ratio typical for signatures
    pub signature_min_aspect: f64,
    pub signature_aspect_score: f64,
    /// Near-square stamps
    pub stamp_aspect: Band,
    pub stamp_aspect_score: f64,
    pub logo_width_mm: Band,
    pub logo_max_height_mm: f64,
    pub logo_size_score: f64,
    pub signature_width_mm: Band,
    pub signature_height_mm: Band,
    pub signature_size_score: f64,
    /// Applies to both sides
    pub stamp_side_mm: Band,
    pub stamp_size_score: f64,
    pub lower_half_signature_score: f64,
    pub lower_half_stamp_score: f64,
    pub top_fifth_logo_score: f64,
    pub keyword_score: f64,
    pub signature_keywords: Vec<String>,
    pub stamp_keywords: Vec<String>,
    pub logo_normaliser: f64,
    pub signature_normaliser: f64,
    pub stamp_normaliser: f64,
    /// Below this confidence the result is flagged ambiguous
    pub ambiguity_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            header_logo_score: 3.0,
            logo_aspect: Band::new(1.5, 4.0),
            logo_aspect_score: 2.0,
            signature_min_aspect: 2.5,
            signature_aspect_score: 2.0,
            stamp_aspect: Band::new(0.8, 1.25),
            stamp_aspect_score: 2.0,
            logo_width_mm: Band::new(20.0, 80.0),
            logo_max_height_mm: 40.0,
            logo_size_score: 1.0,
            signature_width_mm: Band::new(30.0, 90.0),
            signature_height_mm: Band::new(8.0, 35.0),
            signature_size_score: 2.0,
            stamp_side_mm: Band::new(25.0, 50.0),
            stamp_size_score: 2.0,
            lower_half_signature_score: 2.0,
            lower_half_stamp_score: 1.0,
            top_fifth_logo_score: 1.0,
            keyword_score: 3.0,
            signature_keywords: ["unterschrift", "signature", "signed", "gez."]
                .map(String::from)
                .to_vec(),
            stamp_keywords: ["stempel", "stamp", "seal", "siegel"]
                .map(String::from)
                .to_vec(),
            logo_normaliser: 6.0,
            signature_normaliser: 7.0,
            stamp_normaliser: 7.0,
            ambiguity_threshold: 0.5,
        }
    }
}

/// What the classifier looks at
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationInput {
    pub part_kind: PartKind,
    pub width_emu: i64,
    pub height_emu: i64,
    /// Top edge on the page, px
    pub y_px: f64,
    pub page_height_px: f64,
    /// Text of the paragraphs around the image
    pub nearby_text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub object_type: ObjectType,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub ambiguous: bool,
}

#[derive(Debug, Default)]
struct Scores {
    logo: f64,
    signature: f64,
    stamp: f64,
    reasons: Vec<String>,
}

impl Scores {
    fn add(&mut self, category: ObjectType, points: f64, reason: String) {
        match category {
            ObjectType::Logo => self.logo += points,
            ObjectType::Signature => self.signature += points,
            ObjectType::Stamp => self.stamp += points,
            _ => return,
        }
        self.reasons.push(format!("{} +{}: {}", category, points, reason));
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageClassifier {
    config: ClassifierConfig,
}

impl ImageClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn classify(&self, input: &ClassificationInput) -> Classification {
        let c = &self.config;
        let mut scores = Scores::default();

        if input.part_kind == PartKind::Header {
            scores.add(ObjectType::Logo, c.header_logo_score, "in header".into());
        }

        let width_mm = emu_to_mm(input.width_emu);
        let height_mm = emu_to_mm(input.height_emu);

        if input.height_emu > 0 {
            let aspect = input.width_emu as f64 / input.height_emu as f64;
            if c.logo_aspect.contains(aspect) {
                scores.add(ObjectType::Logo, c.logo_aspect_score, format!("aspect {:.2}", aspect));
            }
            if aspect >= c.signature_min_aspect {
                scores.add(ObjectType::Signature, c.signature_aspect_score, format!("aspect {:.2}", aspect));
            }
            if c.stamp_aspect.contains(aspect) {
                scores.add(ObjectType::Stamp, c.stamp_aspect_score, format!("aspect {:.2}", aspect));
            }
        }

        let size = format!("{:.0}x{:.0} mm", width_mm, height_mm);
        if c.logo_width_mm.contains(width_mm) && height_mm <= c.logo_max_height_mm {
            scores.add(ObjectType::Logo, c.logo_size_score, size.clone());
        }
        if c.signature_width_mm.contains(width_mm) && c.signature_height_mm.contains(height_mm) {
            scores.add(ObjectType::Signature, c.signature_size_score, size.clone());
        }
        if c.stamp_side_mm.contains(width_mm) && c.stamp_side_mm.contains(height_mm) {
            scores.add(ObjectType::Stamp, c.stamp_size_score, size);
        }

        if input.page_height_px > 0.0 {
            let relative = input.y_px / input.page_height_px;
            if relative >= 0.5 {
                scores.add(ObjectType::Signature, c.lower_half_signature_score, "lower half of page".into());
                scores.add(ObjectType::Stamp, c.lower_half_stamp_score, "lower half of page".into());
            } else if relative < 0.2 {
                scores.add(ObjectType::Logo, c.top_fifth_logo_score, "top fifth of page".into());
            }
        }

        let text = input.nearby_text.to_lowercase();
        for keyword in &c.signature_keywords {
            if text.contains(keyword.as_str()) {
                scores.add(ObjectType::Signature, c.keyword_score, format!("keyword \"{}\"", keyword));
            }
        }
        for keyword in &c.stamp_keywords {
            if text.contains(keyword.as_str()) {
                scores.add(ObjectType::Stamp, c.keyword_score, format!("keyword \"{}\"", keyword));
            }
        }

        self.decide(scores)
    }

    fn decide(&self, scores: Scores) -> Classification {
        let c = &self.config;
        // Strict comparisons keep the earlier category on ties
        let mut best = (ObjectType::Logo, scores.logo, c.logo_normaliser);
        if scores.signature > best.1 {
            best = (ObjectType::Signature, scores.signature, c.signature_normaliser);
        }
        if scores.stamp > best.1 {
            best = (ObjectType::Stamp, scores.stamp, c.stamp_normaliser);
        }

        let (object_type, score, normaliser) = best;
        if score <= 0.0 {
            return Classification {
                object_type: ObjectType::Image,
                confidence: 1.0,
                reasons: scores.reasons,
                ambiguous: false,
            };
        }

        let confidence = if normaliser > 0.0 {
            (score / normaliser).min(1.0)
        } else {
            1.0
        };
        Classification {
            object_type,
            confidence,
            reasons: scores.reasons,
            ambiguous: confidence < c.ambiguity_threshold,
        }
    }
}
