//! Color arithmetic for palette derivation.
//!
//! Everything here is pure math on RGB triples. The palette module decides
//! *which* colors to use; this module only knows how to represent, parse,
//! and invert them.
//!
//! ## Representation
//!
//! A color is three `u8` channels. Because the channel type is `u8`, every
//! operation is closed over `[0, 255]` — the complement (`255 - c`) can
//! never leave the range, and `complement(complement(c)) == c` holds for
//! every triple.
//!
//! ## Hex convention
//!
//! External services key colors by a bare six-digit uppercase hex string
//! (`"0AC81E"`, no `#`). [`Rgb::to_hex`] and [`Rgb::from_hex`] round-trip
//! that form; [`Rgb::css`] produces the `rgb(r,g,b)` textual form the
//! caption compositor expects for its `-fill` argument.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ColorError {
    #[error("invalid hex color '{0}': expected exactly six hex digits")]
    InvalidHex(String),
}

/// An RGB triple, each channel in `[0, 255]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a bare six-digit hex string (`"0AC81E"`). Case-insensitive,
    /// no `#` prefix.
    pub fn from_hex(hex: &str) -> Result<Self, ColorError> {
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::InvalidHex(hex.to_string()));
        }
        let channel = |range| u8::from_str_radix(&hex[range], 16);
        Ok(Self {
            r: channel(0..2).map_err(|_| ColorError::InvalidHex(hex.to_string()))?,
            g: channel(2..4).map_err(|_| ColorError::InvalidHex(hex.to_string()))?,
            b: channel(4..6).map_err(|_| ColorError::InvalidHex(hex.to_string()))?,
        })
    }

    /// Format as a bare six-digit uppercase hex string.
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// The photographic negative: each channel becomes `255 - value`.
    ///
    /// Involutive: applying it twice returns the original color.
    pub fn complement(self) -> Self {
        Self {
            r: 255 - self.r,
            g: 255 - self.g,
            b: 255 - self.b,
        }
    }

    /// The `rgb(r,g,b)` textual form used by the caption compositor's
    /// fill argument.
    pub fn css(self) -> String {
        format!("rgb({},{},{})", self.r, self.g, self.b)
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}
