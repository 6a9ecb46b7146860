//! Mass sample codec
//!
//! The scale answers a mass request with two bytes, little-endian. Bit 15
//! is a sign flag and bits 0..15 carry the magnitude in grams, so the
//! representable range is `-32767..=32767` g with a distinct negative zero.
//!
//! ```text
//!  byte 0         byte 1
//! [ mmmmmmmm ]  [ s mmmmmmm ]
//!   low bits      sign + high bits
//! ```

use crate::error::ParseError;

/// Sign flag in the 16-bit little-endian word
const SIGN_BIT: u16 = 0x8000;

/// Largest magnitude a sample can carry
pub const MAX_MAGNITUDE: u16 = 0x7FFF;

/// A decoded mass sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MassSample {
    /// Sign flag as reported by the scale
    pub negative: bool,
    /// Magnitude in grams (15 bits)
    pub magnitude: u16,
}

impl MassSample {
    /// Build a sample from a sign flag and magnitude
    ///
    /// Returns `None` if the magnitude does not fit in 15 bits.
    pub fn new(negative: bool, magnitude: u16) -> Option<Self> {
        (magnitude <= MAX_MAGNITUDE).then_some(Self {
            negative,
            magnitude,
        })
    }

    /// Build a sample from a signed gram value
    pub fn from_grams(grams: i32) -> Option<Self> {
        let magnitude = u16::try_from(grams.unsigned_abs()).ok()?;
        Self::new(grams < 0, magnitude)
    }

    /// Decode a raw reply
    ///
    /// Fails with [`ParseError::InvalidLength`] unless `data` is exactly two
    /// bytes long.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ParseError> {
        let bytes: [u8; 2] = data
            .try_into()
            .map_err(|_| ParseError::InvalidLength(data.len()))?;
        let raw = u16::from_le_bytes(bytes);
        Ok(Self {
            negative: raw & SIGN_BIT != 0,
            magnitude: raw & MAX_MAGNITUDE,
        })
    }

    /// Encode to the two bytes the scale would send
    pub fn to_bytes(self) -> [u8; 2] {
        let mut raw = self.magnitude & MAX_MAGNITUDE;
        if self.negative {
            raw |= SIGN_BIT;
        }
        raw.to_le_bytes()
    }

    /// Signed weight in grams
    pub fn grams(self) -> i32 {
        let magnitude = i32::from(self.magnitude);
        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Signed weight in kilograms
    pub fn kilograms(self) -> f64 {
        f64::from(self.grams()) / 1000.0
    }
}

/// Decode a raw mass reply into signed grams
pub fn decode_grams(data: &[u8]) -> Result<i32, ParseError> {
    MassSample::from_bytes(data).map(MassSample::grams)
}
