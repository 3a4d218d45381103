//! Cell color tokens.
//!
//! A color token is a CSS hex color (`#rgb` or `#rrggbb`). The token text is
//! kept exactly as written so that documents round-trip byte for byte; two
//! tokens compare equal only when their text is equal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CanvasError;

/// Background color of the canvas, also written by the eraser.
pub const BACKGROUND: &str = "#081226";

/// A validated cell color token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    /// Parse a color token.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidColor`] unless the input is `#` followed
    /// by exactly 3 or 6 hex digits.
    pub fn parse(token: impl Into<String>) -> Result<Self, CanvasError> {
        let token = token.into();
        if is_hex_color(&token) {
            Ok(Self(token))
        } else {
            Err(CanvasError::InvalidColor(token))
        }
    }

    /// The canvas background color.
    #[must_use]
    pub fn background() -> Self {
        Self(BACKGROUND.to_string())
    }

    /// The token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the background token.
    #[must_use]
    pub fn is_background(&self) -> bool {
        self.0.eq_ignore_ascii_case(BACKGROUND)
    }

    /// Decode to opaque RGBA bytes.
    #[must_use]
    pub fn to_rgba(&self) -> [u8; 4] {
        let digits = &self.0[1..];
        // Validated on construction, so every digit parses.
        let nibble = |c: u8| match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            b'A'..=b'F' => c - b'A' + 10,
            _ => 0,
        };
        let bytes = digits.as_bytes();
        if bytes.len() == 3 {
            let expand = |c: u8| nibble(c) * 17;
            [expand(bytes[0]), expand(bytes[1]), expand(bytes[2]), 255]
        } else {
            let pair = |i: usize| nibble(bytes[i]) * 16 + nibble(bytes[i + 1]);
            [pair(0), pair(2), pair(4), 255]
        }
    }
}

fn is_hex_color(token: &str) -> bool {
    let Some(digits) = token.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

impl Default for Color {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Color {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Color {
    type Error = CanvasError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}
