//! Side-panel diagrams. Each one is laid out by a pure function and painted
//! with an egui painter; a click comes back as a [`DiagramAction`].

pub mod alluvial;
pub mod chord;
pub mod etymology;

use egui::Color32;

use super::geometry::lerp_color;

pub const RAMP_LOW: Color32 = Color32::from_rgb(0x76, 0xb5, 0xde);
pub const RAMP_HIGH: Color32 = Color32::from_rgb(0x07, 0x54, 0x86);
pub const HOVER: Color32 = Color32::from_rgb(0xff, 0x66, 0x66);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagramAction {
    Language(String),
    Pair(String, String),
    Word { word: String, lang: String },
}

/// Two-colour ramp used by the chord arcs and the alluvial links.
pub fn ramp(t: f32) -> Color32 {
    lerp_color(RAMP_LOW, RAMP_HIGH, t)
}
