//! Style classes carried by every shape, and the settings new shapes copy.

use peniko::Color;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Serializable color representation (RGBA8).
///
/// On the wire a color is a `#rrggbb` string, or `#rrggbbaa` when it is not
/// fully opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 => {
                let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
                Some(Self::new(nibble(0)?, nibble(1)?, nibble(2)?, 255))
            }
            6 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl fmt::Display for SerializableColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

impl Serialize for SerializableColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SerializableColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color `{s}`")))
    }
}

/// `Option<SerializableColor>` where `None` travels as `"transparent"`.
pub(crate) mod fill_color {
    use super::SerializableColor;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const TRANSPARENT: &str = "transparent";

    pub fn serialize<S: Serializer>(
        value: &Option<SerializableColor>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(color) => serializer.serialize_str(&color.to_hex()),
            None => serializer.serialize_str(TRANSPARENT),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<SerializableColor>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        match s.as_deref() {
            None | Some(TRANSPARENT) | Some("") => Ok(None),
            Some(hex) => SerializableColor::from_hex(hex)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid fill `{hex}`"))),
        }
    }
}

/// Sloppiness level for hand-drawn effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sloppiness {
    /// Clean, precise lines.
    Architect,
    #[default]
    Artist,
    /// Very sketchy.
    Cartoonist,
}

impl Sloppiness {
    /// Roughness value handed to the sketch renderer.
    pub fn roughness(&self) -> f64 {
        match self {
            Sloppiness::Architect => 0.0,
            Sloppiness::Artist => 1.0,
            Sloppiness::Cartoonist => 2.0,
        }
    }

    /// Cycle to the next sloppiness level.
    pub fn next(self) -> Self {
        match self {
            Sloppiness::Architect => Sloppiness::Artist,
            Sloppiness::Artist => Sloppiness::Cartoonist,
            Sloppiness::Cartoonist => Sloppiness::Architect,
        }
    }
}

/// Fill pattern style for shapes (names follow roughjs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillPattern {
    /// Parallel diagonal lines.
    #[default]
    Hachure,
    Solid,
    #[serde(rename = "zigzag")]
    ZigZag,
    CrossHatch,
    Dots,
    Dashed,
    #[serde(rename = "zigzag-line")]
    ZigZagLine,
}

impl FillPattern {
    /// Cycle to the next fill pattern.
    pub fn next(self) -> Self {
        match self {
            FillPattern::Hachure => FillPattern::Solid,
            FillPattern::Solid => FillPattern::ZigZag,
            FillPattern::ZigZag => FillPattern::CrossHatch,
            FillPattern::CrossHatch => FillPattern::Dots,
            FillPattern::Dots => FillPattern::Dashed,
            FillPattern::Dashed => FillPattern::ZigZagLine,
            FillPattern::ZigZagLine => FillPattern::Hachure,
        }
    }

    /// Name understood by roughjs-style renderers.
    pub fn as_str(&self) -> &'static str {
        match self {
            FillPattern::Hachure => "hachure",
            FillPattern::Solid => "solid",
            FillPattern::ZigZag => "zigzag",
            FillPattern::CrossHatch => "cross-hatch",
            FillPattern::Dots => "dots",
            FillPattern::Dashed => "dashed",
            FillPattern::ZigZagLine => "zigzag-line",
        }
    }
}

/// Dash class of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl StrokeStyle {
    /// Cycle to the next stroke style.
    pub fn next(self) -> Self {
        match self {
            StrokeStyle::Solid => StrokeStyle::Dashed,
            StrokeStyle::Dashed => StrokeStyle::Dotted,
            StrokeStyle::Dotted => StrokeStyle::Solid,
        }
    }

    /// Dash pattern for a given stroke width; empty for solid strokes.
    pub fn line_dash(&self, width: f64) -> Vec<f64> {
        match self {
            StrokeStyle::Solid => Vec::new(),
            StrokeStyle::Dashed => vec![8.0 + width, 8.0 + width],
            StrokeStyle::Dotted => vec![1.5, 6.0 + width],
        }
    }
}

/// Stroke width class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrokeWidth {
    Thin,
    #[default]
    Bold,
    ExtraBold,
}

impl StrokeWidth {
    pub fn width(&self) -> f64 {
        match self {
            StrokeWidth::Thin => 1.0,
            StrokeWidth::Bold => 2.0,
            StrokeWidth::ExtraBold => 4.0,
        }
    }

    pub fn next(self) -> Self {
        match self {
            StrokeWidth::Thin => StrokeWidth::Bold,
            StrokeWidth::Bold => StrokeWidth::ExtraBold,
            StrokeWidth::ExtraBold => StrokeWidth::Thin,
        }
    }
}

/// Style carried by a shape on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeOptions {
    pub roughness: Sloppiness,
    pub stroke_style: StrokeStyle,
    pub stroke_width: StrokeWidth,
    pub fill_style: FillPattern,
    /// Fill color (None = no fill).
    #[serde(with = "fill_color", default)]
    pub fill: Option<SerializableColor>,
    pub stroke: SerializableColor,
    /// Random seed for the hand-drawn effect, stable for the shape's lifetime.
    pub seed: u32,
}

impl ShapeOptions {
    pub fn stroke_color(&self) -> Color {
        self.stroke.into()
    }

    pub fn fill_color(&self) -> Option<Color> {
        self.fill.map(Color::from)
    }
}

impl Default for ShapeOptions {
    fn default() -> Self {
        StyleSettings::default().options()
    }
}

/// Style settings applied to newly created shapes and to restyled ones.
///
/// Owned by the interaction controller and passed explicitly to every shape
/// constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleSettings {
    pub roughness: Sloppiness,
    pub stroke_style: StrokeStyle,
    pub stroke_width: StrokeWidth,
    pub fill_style: FillPattern,
    #[serde(with = "fill_color")]
    pub fill: Option<SerializableColor>,
    pub stroke: SerializableColor,
    /// Diameter of the eraser brush.
    pub eraser_size: f64,
    /// Font size used for new text.
    pub font_size: f64,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            roughness: Sloppiness::default(),
            stroke_style: StrokeStyle::default(),
            stroke_width: StrokeWidth::default(),
            fill_style: FillPattern::default(),
            fill: None,
            stroke: SerializableColor::black(),
            eraser_size: 20.0,
            font_size: 20.0,
        }
    }
}

impl StyleSettings {
    /// Copy of these settings with a fresh render seed.
    pub fn options(&self) -> ShapeOptions {
        self.options_with_seed(generate_seed())
    }

    /// Copy of these settings with a given seed.
    pub fn options_with_seed(&self, seed: u32) -> ShapeOptions {
        ShapeOptions {
            roughness: self.roughness,
            stroke_style: self.stroke_style,
            stroke_width: self.stroke_width,
            fill_style: self.fill_style,
            fill: self.fill,
            stroke: self.stroke,
            seed,
        }
    }
}

/// Generate a random seed for new shapes.
/// Uses a counter mixed with a splitmix32-style hash so it needs no clock or RNG.
pub fn generate_seed() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};

    static SEED_COUNTER: AtomicU32 = AtomicU32::new(1);

    let counter = SEED_COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut x = counter.wrapping_mul(0x9E3779B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x85EBCA6B);
    x ^= x >> 13;
    x = x.wrapping_mul(0xC2B2AE35);
    x ^= x >> 16;
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_colors() {
        assert_eq!(
            SerializableColor::from_hex("#1e1e1e"),
            Some(SerializableColor::new(0x1e, 0x1e, 0x1e, 255))
        );
        assert_eq!(
            SerializableColor::from_hex("#fff"),
            Some(SerializableColor::white())
        );
        assert_eq!(
            SerializableColor::from_hex("#ff000080"),
            Some(SerializableColor::new(255, 0, 0, 128))
        );
        assert_eq!(SerializableColor::from_hex("red"), None);
        assert_eq!(SerializableColor::from_hex("#12345"), None);
        assert_eq!(SerializableColor::new(255, 0, 0, 128).to_hex(), "#ff000080");
        assert_eq!(SerializableColor::black().to_hex(), "#000000");
    }

    #[test]
    fn test_option_classes_are_kebab_case() {
        let json = serde_json::to_string(&FillPattern::CrossHatch).unwrap();
        assert_eq!(json, "\"cross-hatch\"");
        let json = serde_json::to_string(&Sloppiness::Architect).unwrap();
        assert_eq!(json, "\"architect\"");
        let json = serde_json::to_string(&StrokeWidth::ExtraBold).unwrap();
        assert_eq!(json, "\"extra-bold\"");
        let zigzag: FillPattern = serde_json::from_str("\"zigzag-line\"").unwrap();
        assert_eq!(zigzag, FillPattern::ZigZagLine);
    }

    #[test]
    fn test_missing_fill_is_transparent() {
        let options = StyleSettings::default().options();
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["fill"], "transparent");
        assert_eq!(json["strokeStyle"], "solid");

        let back: ShapeOptions = serde_json::from_value(json).unwrap();
        assert_eq!(back.fill, None);
    }

    #[test]
    fn test_options_get_fresh_seeds() {
        let settings = StyleSettings::default();
        let a = settings.options();
        let b = settings.options();
        assert_ne!(a.seed, b.seed);
        assert_eq!(a.stroke, b.stroke);
    }

    #[test]
    fn test_cycling() {
        assert_eq!(Sloppiness::Cartoonist.next(), Sloppiness::Architect);
        assert_eq!(StrokeStyle::Dotted.next(), StrokeStyle::Solid);
        assert_eq!(FillPattern::ZigZagLine.next(), FillPattern::Hachure);
        assert_eq!(StrokeWidth::ExtraBold.next(), StrokeWidth::Thin);
    }
}
