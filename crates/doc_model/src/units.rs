//! Unit conversion between the length units OOXML and the canvas disagree on
//!
//! - EMU (English Metric Unit): drawings, 914 400 per inch
//! - Twip: page and paragraph geometry, 1 440 per inch
//! - Pixel: canvas coordinates at 96 dpi
//! - Millimetre: placement rules

/// EMUs per inch
pub const EMU_PER_INCH: i64 = 914_400;
/// EMUs per CSS pixel (96 dpi)
pub const EMU_PER_PX: i64 = 9_525;
/// EMUs per twip
pub const EMU_PER_TWIP: i64 = 635;
/// EMUs per millimetre
pub const EMU_PER_MM: i64 = 36_000;
/// Twips per inch
pub const TWIPS_PER_INCH: i64 = 1_440;
/// Twips per CSS pixel
pub const TWIPS_PER_PX: f64 = 15.0;
/// Pixels per inch
pub const PX_PER_INCH: f64 = 96.0;
/// Millimetres per inch
pub const MM_PER_INCH: f64 = 25.4;
/// Points per inch
pub const PT_PER_INCH: f64 = 72.0;

pub fn emu_to_px(emu: i64) -> f64 {
    emu as f64 / EMU_PER_PX as f64
}

pub fn px_to_emu(px: f64) -> i64 {
    (px * EMU_PER_PX as f64).round() as i64
}

pub fn twips_to_px(twips: i64) -> f64 {
    twips as f64 / TWIPS_PER_PX
}

pub fn px_to_twips(px: f64) -> i64 {
    (px * TWIPS_PER_PX).round() as i64
}

pub fn mm_to_px(mm: f64) -> f64 {
    mm * PX_PER_INCH / MM_PER_INCH
}

pub fn px_to_mm(px: f64) -> f64 {
    px * MM_PER_INCH / PX_PER_INCH
}

pub fn emu_to_mm(emu: i64) -> f64 {
    emu as f64 / EMU_PER_MM as f64
}

pub fn mm_to_emu(mm: f64) -> i64 {
    (mm * EMU_PER_MM as f64).round() as i64
}

pub fn twips_to_emu(twips: i64) -> i64 {
    twips * EMU_PER_TWIP
}

/// Convert EMUs to twips, rounding to the nearest twip
pub fn emu_to_twips(emu: i64) -> i64 {
    (emu as f64 / EMU_PER_TWIP as f64).round() as i64
}

/// Convert typographic points to pixels
pub fn pt_to_px(pt: f64) -> f64 {
    pt * PX_PER_INCH / PT_PER_INCH
}

/// Convert OOXML half-points (font sizes) to points
pub fn half_points_to_pt(half_points: i64) -> f64 {
    half_points as f64 / 2.0
}
