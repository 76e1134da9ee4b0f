//! Hex-triplet colors and contrast selection.
//!
//! Hex types carry a display color written as `#RRGGBB` or `#RGB`. Text and
//! outlines drawn on top of a hex use [`Rgb::contrast`] so they stay legible
//! whatever color the user picked.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Luma above which a background counts as light.
const LIGHT_LUMA_THRESHOLD: f64 = 186.0;

/// Errors produced while parsing a color string
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ColorError {
    #[error("Invalid HEX color: {0:?}")]
    InvalidColorFormat(String),
}

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    /// Create a color from its components
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Perceived brightness, 0 (black) to 255 (white).
    pub fn luma(&self) -> f64 {
        0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64
    }

    /// Black on light colors, white on dark ones.
    pub fn contrast(&self) -> Rgb {
        if self.luma() > LIGHT_LUMA_THRESHOLD {
            Rgb::BLACK
        } else {
            Rgb::WHITE
        }
    }
}

impl FromStr for Rgb {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ColorError::InvalidColorFormat(s.to_string());
        let digits = s.strip_prefix('#').unwrap_or(s);

        let expanded: String = match digits.chars().count() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(invalid()),
        };
        if !expanded.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| invalid());
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Contrast color for a `#RRGGBB` / `#RGB` string.
pub fn contrast_color(color: &str) -> Result<Rgb, ColorError> {
    Ok(color.parse::<Rgb>()?.contrast())
}
