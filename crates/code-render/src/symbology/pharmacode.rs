//! One-track pharmacode.

use super::{EncodeError, require_digits};

pub const MIN: u64 = 3;
pub const MAX: u64 = 131_070;

const THICK: [bool; 5] = [true, true, true, false, false];
const THIN: [bool; 3] = [true, false, false];

/// Bars are built from the least significant end: an even remainder yields a
/// thick bar, an odd one a thin bar. The trailing two-module space is dropped.
pub fn encode(value: &str) -> Result<Vec<bool>, EncodeError> {
    require_digits(value)?;
    let mut n: u64 = value.parse().map_err(|_| EncodeError::OutOfRange {
        value: u64::MAX,
        min: MIN,
        max: MAX,
    })?;
    if !(MIN..=MAX).contains(&n) {
        return Err(EncodeError::OutOfRange {
            value: n,
            min: MIN,
            max: MAX,
        });
    }

    let mut bars: Vec<&[bool]> = Vec::new();
    while n != 0 {
        if n % 2 == 0 {
            bars.push(&THICK);
            n = (n - 2) / 2;
        } else {
            bars.push(&THIN);
            n = (n - 1) / 2;
        }
    }

    let mut out: Vec<bool> = bars.iter().rev().flat_map(|b| b.iter().copied()).collect();
    out.truncate(out.len().saturating_sub(2));
    Ok(out)
}
