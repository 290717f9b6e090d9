//! Interleaved 2 of 5.

use super::{EncodeError, push_bits, require_digits};

const START: &str = "1010";
const END: &str = "11101";

/// Wide (`1`) / narrow (`0`) element pattern per digit.
const DIGITS: [&[u8; 5]; 10] = [
    b"00110", b"10001", b"01001", b"11000", b"00101", b"10100", b"01100", b"00011", b"10010",
    b"01010",
];

/// Encode an even-length digit string. Bars carry the first digit of each
/// pair, spaces the second; wide elements are three modules.
pub fn encode(value: &str) -> Result<Vec<bool>, EncodeError> {
    require_digits(value)?;
    if value.len() % 2 != 0 {
        return Err(EncodeError::InvalidLength {
            len: value.len(),
            expected: "an even number of digits",
        });
    }

    let mut out = Vec::new();
    push_bits(&mut out, START);
    for pair in value.as_bytes().chunks_exact(2) {
        let bars = DIGITS[usize::from(pair[0] - b'0')];
        let spaces = DIGITS[usize::from(pair[1] - b'0')];
        for i in 0..5 {
            push_bits(&mut out, if bars[i] == b'1' { "111" } else { "1" });
            push_bits(&mut out, if spaces[i] == b'1' { "000" } else { "0" });
        }
    }
    push_bits(&mut out, END);
    Ok(out)
}
