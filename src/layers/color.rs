use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{TextBehindError, TextBehindResult};

/// Straight-alpha RGBA8 color as edited by the UI (`color`, `shadowColor`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel (255 = opaque).
    pub a: u8,
}

impl Color {
    /// Opaque white, the default text color.
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
    /// Opaque black.
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// Build a color from straight-alpha channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Premultiply for compositing.
    pub fn to_premul(self) -> Rgba8Premul {
        Rgba8Premul::from_straight_rgba(self.r, self.g, self.b, self.a)
    }

    /// Parse a CSS color value.
    ///
    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`, `rgba(r, g, b, a)` (alpha in 0..=1)
    /// and a small set of named colors.
    pub fn parse_css(s: &str) -> TextBehindResult<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = s.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
        {
            let args = args.strip_suffix(')').ok_or_else(|| {
                TextBehindError::validation(format!("unterminated color function \"{s}\""))
            })?;
            return parse_rgb_args(args);
        }
        named(&lower)
            .ok_or_else(|| TextBehindError::validation(format!("unrecognized color \"{s}\"")))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl FromStr for Color {
    type Err = TextBehindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_css(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "#{:02x}{:02x}{:02x}{:02x}",
                self.r, self.g, self.b, self.a
            )
        }
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Css(String),
            Arr(Vec<u8>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Css(s) => Self::parse_css(&s).map_err(serde::de::Error::custom),
            Repr::Arr(v) => match v.as_slice() {
                [r, g, b] => Ok(Self::rgba(*r, *g, *b, 255)),
                [r, g, b, a] => Ok(Self::rgba(*r, *g, *b, *a)),
                _ => Err(serde::de::Error::custom(
                    "rgba array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                )),
            },
        }
    }
}

fn parse_hex(s: &str) -> TextBehindResult<Color> {
    fn hex_byte(pair: &str) -> TextBehindResult<u8> {
        u8::from_str_radix(pair, 16)
            .map_err(|_| TextBehindError::validation(format!("invalid hex byte \"{pair}\"")))
    }
    fn hex_nibble(c: &str) -> TextBehindResult<u8> {
        let v = hex_byte(c)?;
        Ok(v * 17)
    }

    if !s.is_ascii() {
        return Err(TextBehindError::validation("hex color must be ascii"));
    }
    match s.len() {
        3 => Ok(Color::rgba(
            hex_nibble(&s[0..1])?,
            hex_nibble(&s[1..2])?,
            hex_nibble(&s[2..3])?,
            255,
        )),
        6 => Ok(Color::rgba(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            255,
        )),
        8 => Ok(Color::rgba(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            hex_byte(&s[6..8])?,
        )),
        _ => Err(TextBehindError::validation(
            "hex color must be #RGB, #RRGGBB or #RRGGBBAA",
        )),
    }
}

fn parse_rgb_args(args: &str) -> TextBehindResult<Color> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let channel = |p: &str| -> TextBehindResult<u8> {
        let v: f64 = p
            .parse()
            .map_err(|_| TextBehindError::validation(format!("invalid color channel \"{p}\"")))?;
        Ok(v.round().clamp(0.0, 255.0) as u8)
    };
    let alpha = |p: &str| -> TextBehindResult<u8> {
        let v: f64 = p
            .parse()
            .map_err(|_| TextBehindError::validation(format!("invalid alpha \"{p}\"")))?;
        Ok((v.clamp(0.0, 1.0) * 255.0).round() as u8)
    };
    match parts.as_slice() {
        [r, g, b] => Ok(Color::rgba(channel(r)?, channel(g)?, channel(b)?, 255)),
        [r, g, b, a] => Ok(Color::rgba(channel(r)?, channel(g)?, channel(b)?, alpha(a)?)),
        _ => Err(TextBehindError::validation(
            "rgb()/rgba() expects 3 or 4 comma-separated values",
        )),
    }
}

fn named(name: &str) -> Option<Color> {
    let c = match name {
        "white" => Color::WHITE,
        "black" => Color::BLACK,
        "transparent" => Color::TRANSPARENT,
        "red" => Color::rgba(255, 0, 0, 255),
        "green" => Color::rgba(0, 128, 0, 255),
        "lime" => Color::rgba(0, 255, 0, 255),
        "blue" => Color::rgba(0, 0, 255, 255),
        "yellow" => Color::rgba(255, 255, 0, 255),
        "orange" => Color::rgba(255, 165, 0, 255),
        "purple" => Color::rgba(128, 0, 128, 255),
        "pink" => Color::rgba(255, 192, 203, 255),
        "gray" | "grey" => Color::rgba(128, 128, 128, 255),
        "silver" => Color::rgba(192, 192, 192, 255),
        "cyan" | "aqua" => Color::rgba(0, 255, 255, 255),
        "magenta" | "fuchsia" => Color::rgba(255, 0, 255, 255),
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
#[path = "../../tests/unit/layers/color.rs"]
mod tests;
