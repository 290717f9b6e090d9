//! Linear barcode symbology encoders.
//!
//! Each encoder turns a value into a module sequence: one `bool` per module,
//! `true` for a bar and `false` for a space. Quiet zones are not included;
//! the rasterizer adds them as margins.

pub mod code128;
pub mod code39;
pub mod itf;
pub mod msi;
pub mod pharmacode;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors raised when a value cannot be expressed in a symbology.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("value is empty")]
    Empty,

    #[error("character {ch:?} at position {position} is not encodable")]
    InvalidChar { ch: char, position: usize },

    #[error("invalid length {len}: {expected}")]
    InvalidLength { len: usize, expected: &'static str },

    #[error("value {value} is outside {min}..={max}")]
    OutOfRange { value: u64, min: u64, max: u64 },
}

/// Supported linear symbologies, keyed by the encoder key used in the format registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbology {
    #[serde(rename = "CODE128")]
    Code128,
    #[serde(rename = "ITF")]
    Itf,
    #[serde(rename = "CODE39")]
    Code39,
    #[serde(rename = "MSI")]
    Msi,
    #[serde(rename = "pharmacode")]
    Pharmacode,
}

impl Symbology {
    pub const ALL: [Symbology; 5] = [
        Symbology::Code128,
        Symbology::Itf,
        Symbology::Code39,
        Symbology::Msi,
        Symbology::Pharmacode,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Symbology::Code128 => "CODE128",
            Symbology::Itf => "ITF",
            Symbology::Code39 => "CODE39",
            Symbology::Msi => "MSI",
            Symbology::Pharmacode => "pharmacode",
        }
    }

    /// Encode `value` into a module sequence.
    pub fn encode(self, value: &str) -> Result<Vec<bool>, EncodeError> {
        match self {
            Symbology::Code128 => code128::encode(value),
            Symbology::Itf => itf::encode(value),
            Symbology::Code39 => code39::encode(value),
            Symbology::Msi => msi::encode(value),
            Symbology::Pharmacode => pharmacode::encode(value),
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error for an encoder key that names no known symbology.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown symbology: {0}")]
pub struct UnknownSymbology(pub String);

impl FromStr for Symbology {
    type Err = UnknownSymbology;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbology::ALL
            .into_iter()
            .find(|sym| sym.key() == s)
            .ok_or_else(|| UnknownSymbology(s.to_string()))
    }
}

/// Expand a width pattern (e.g. `"212222"`) into alternating bar/space modules,
/// starting with a bar.
pub(crate) fn push_widths(out: &mut Vec<bool>, widths: &[u8]) {
    for (i, &w) in widths.iter().enumerate() {
        let bar = i % 2 == 0;
        out.extend(std::iter::repeat_n(bar, usize::from(w)));
    }
}

/// Expand a binary pattern string (`'1'` = bar) into modules.
pub(crate) fn push_bits(out: &mut Vec<bool>, bits: &str) {
    out.extend(bits.bytes().map(|b| b == b'1'));
}

pub(crate) fn require_digits(value: &str) -> Result<(), EncodeError> {
    if value.is_empty() {
        return Err(EncodeError::Empty);
    }
    match value.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((position, ch)) => Err(EncodeError::InvalidChar { ch, position }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_from_str() {
        for sym in Symbology::ALL {
            assert_eq!(sym.key().parse::<Symbology>().unwrap(), sym);
        }
        assert!("EAN13".parse::<Symbology>().is_err());
    }

    #[test]
    fn push_widths_alternates_starting_with_bar() {
        let mut out = Vec::new();
        push_widths(&mut out, &[2, 1, 3]);
        assert_eq!(out, [true, true, false, true, true, true]);
    }

    #[test]
    fn require_digits_reports_position() {
        assert_eq!(
            require_digits("12x4"),
            Err(EncodeError::InvalidChar { ch: 'x', position: 2 })
        );
        assert_eq!(require_digits(""), Err(EncodeError::Empty));
    }
}
