use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ComposeError;

/// Straight (non-premultiplied) 8-bit text color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl TextColor {
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Accepts `#rgb`, `#rgba`, `#rrggbb` and `#rrggbbaa`; the `#` is optional.
    pub fn parse(value: &str) -> Result<Self, ComposeError> {
        parse_hex(value).map_err(|reason| {
            ComposeError::config(format!("invalid color '{}': {}", value.trim(), reason))
        })
    }

    /// `#rrggbb`, the SVG `fill` value.
    pub fn svg_fill(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Alpha in `0..=1`, the SVG `fill-opacity` value.
    pub fn opacity(&self) -> f32 {
        self.a as f32 / 255.0
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl FromStr for TextColor {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TextColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "{}", self.svg_fill())
        } else {
            write!(f, "{}{:02x}", self.svg_fill(), self.a)
        }
    }
}

impl Serialize for TextColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TextColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_hex(&raw).map_err(serde::de::Error::custom)
    }
}

fn parse_hex(s: &str) -> Result<TextColor, String> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);
    if let Some(bad) = s.chars().find(|ch| !ch.is_ascii_hexdigit()) {
        return Err(format!("hex color has non-hex character {bad:?}"));
    }

    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    fn hex_nibble(digit: &str) -> Result<u8, String> {
        let value = hex_byte(digit)?;
        Ok(value * 17)
    }

    let color = match s.len() {
        3 | 4 => {
            let r = hex_nibble(&s[0..1])?;
            let g = hex_nibble(&s[1..2])?;
            let b = hex_nibble(&s[2..3])?;
            let a = if s.len() == 4 {
                hex_nibble(&s[3..4])?
            } else {
                255
            };
            TextColor::rgba(r, g, b, a)
        }
        6 | 8 => {
            let r = hex_byte(&s[0..2])?;
            let g = hex_byte(&s[2..4])?;
            let b = hex_byte(&s[4..6])?;
            let a = if s.len() == 8 {
                hex_byte(&s[6..8])?
            } else {
                255
            };
            TextColor::rgba(r, g, b, a)
        }
        _ => {
            return Err(
                "hex color must be #RGB, #RGBA, #RRGGBB or #RRGGBBAA (case-insensitive)".to_owned(),
            );
        }
    };
    Ok(color)
}
