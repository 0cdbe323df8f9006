use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let raw = value.trim();
        let hex = raw
            .strip_prefix('#')
            .ok_or_else(|| Error::Config(format!("invalid color {raw:?}: expected #RRGGBB")))?;
        let digits = hex
            .chars()
            .map(|ch| ch.to_digit(16).map(|d| d as u8))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| Error::Config(format!("invalid color {raw:?}: not hexadecimal")))?;
        match digits.len() {
            3 => Ok(Color::rgb(
                digits[0] * 17,
                digits[1] * 17,
                digits[2] * 17,
            )),
            6 => Ok(Color::rgb(
                digits[0] * 16 + digits[1],
                digits[2] * 16 + digits[3],
                digits[4] * 16 + digits[5],
            )),
            8 => Ok(Color::rgba(
                digits[0] * 16 + digits[1],
                digits[2] * 16 + digits[3],
                digits[4] * 16 + digits[5],
                digits[6] * 16 + digits[7],
            )),
            n => Err(Error::Config(format!(
                "invalid color {raw:?}: expected 3, 6 or 8 hex digits, got {n}"
            ))),
        }
    }

    /// Linear blend from `self` (t = 0) to `other` (t = 1), rounded per channel.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 {
            let a = a as f32;
            let b = b as f32;
            (a + t * (b - a)).round().clamp(0.0, 255.0) as u8
        };
        Color::rgba(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    /// Source-over of `overlay` at `opacity` onto an opaque base color.
    pub fn blend_over(self, overlay: Color, opacity: f32) -> Color {
        let alpha = (overlay.a as f32 / 255.0) * opacity.clamp(0.0, 1.0);
        let mix = |base: u8, top: u8| -> u8 {
            (base as f32 * (1.0 - alpha) + top as f32 * alpha)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Color::rgba(
            mix(self.r, overlay.r),
            mix(self.g, overlay.g),
            mix(self.b, overlay.b),
            self.a,
        )
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// `fill` / `fill-opacity` pair for SVG attributes.
    pub(crate) fn svg_paint(self) -> (String, f32) {
        (
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b),
            self.a as f32 / 255.0,
        )
    }

    /// Premultiplied RGBA8 bytes, the layout tiny-skia stores.
    pub(crate) fn premultiplied(self) -> [u8; 4] {
        let a = self.a as u16;
        let premul = |c: u8| -> u8 { ((c as u16 * a + 127) / 255) as u8 };
        [premul(self.r), premul(self.g), premul(self.b), self.a]
    }

    pub(crate) fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Color::parse(s)
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Color::parse(&value)
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_hex()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
