//! Plain MSI (modified Plessey) without check digit.

use super::{EncodeError, push_bits, require_digits};

pub fn encode(value: &str) -> Result<Vec<bool>, EncodeError> {
    require_digits(value)?;

    let mut out = Vec::with_capacity(value.len() * 12 + 7);
    push_bits(&mut out, "110");
    for digit in value.bytes().map(|b| b - b'0') {
        for shift in (0..4).rev() {
            let bit = (digit >> shift) & 1;
            push_bits(&mut out, if bit == 1 { "110" } else { "100" });
        }
    }
    push_bits(&mut out, "1001");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_bits_are_msb_first() {
        let modules = encode("5").unwrap();
        let bits: String = modules.iter().map(|&m| if m { '1' } else { '0' }).collect();
        // 5 = 0101
        assert_eq!(bits, "110".to_owned() + "100110100110" + "1001");
    }

    #[test]
    fn rejects_non_digits() {
        assert!(encode("1-2").is_err());
    }
}
