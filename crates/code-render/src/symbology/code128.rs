//! Code 128 with automatic A/B/C code-set selection.

use super::{EncodeError, push_widths};

const START_A: u8 = 103;
const START_B: u8 = 104;
const START_C: u8 = 105;
const SHIFT: u8 = 98;
const CODE_C: u8 = 99;
const CODE_B: u8 = 100;
const CODE_A: u8 = 101;

const STOP: [u8; 7] = [2, 3, 3, 1, 1, 1, 2];

/// Bar/space widths for symbol values 0..=105.
#[rustfmt::skip]
const PATTERNS: [[u8; 6]; 106] = [
    [2,1,2,2,2,2], [2,2,2,1,2,2], [2,2,2,2,2,1], [1,2,1,2,2,3], [1,2,1,3,2,2],
    [1,3,1,2,2,2], [1,2,2,2,1,3], [1,2,2,3,1,2], [1,3,2,2,1,2], [2,2,1,2,1,3],
    [2,2,1,3,1,2], [2,3,1,2,1,2], [1,1,2,2,3,2], [1,2,2,1,3,2], [1,2,2,2,3,1],
    [1,1,3,2,2,2], [1,2,3,1,2,2], [1,2,3,2,2,1], [2,2,3,2,1,1], [2,2,1,1,3,2],
    [2,2,1,2,3,1], [2,1,3,2,1,2], [2,2,3,1,1,2], [3,1,2,1,3,1], [3,1,1,2,2,2],
    [3,2,1,1,2,2], [3,2,1,2,2,1], [3,1,2,2,1,2], [3,2,2,1,1,2], [3,2,2,2,1,1],
    [2,1,2,1,2,3], [2,1,2,3,2,1], [2,3,2,1,2,1], [1,1,1,3,2,3], [1,3,1,1,2,3],
    [1,3,1,3,2,1], [1,1,2,3,1,3], [1,3,2,1,1,3], [1,3,2,3,1,1], [2,1,1,3,1,3],
    [2,3,1,1,1,3], [2,3,1,3,1,1], [1,1,2,1,3,3], [1,1,2,3,3,1], [1,3,2,1,3,1],
    [1,1,3,1,2,3], [1,1,3,3,2,1], [1,3,3,1,2,1], [3,1,3,1,2,1], [2,1,1,3,3,1],
    [2,3,1,1,3,1], [2,1,3,1,1,3], [2,1,3,3,1,1], [2,1,3,1,3,1], [3,1,1,1,2,3],
    [3,1,1,3,2,1], [3,3,1,1,2,1], [3,1,2,1,1,3], [3,1,2,3,1,1], [3,3,2,1,1,1],
    [3,1,4,1,1,1], [2,2,1,4,1,1], [4,3,1,1,1,1], [1,1,1,2,2,4], [1,1,1,4,2,2],
    [1,2,1,1,2,4], [1,2,1,4,2,1], [1,4,1,1,2,2], [1,4,1,2,2,1], [1,1,2,2,1,4],
    [1,1,2,4,1,2], [1,2,2,1,1,4], [1,2,2,4,1,1], [1,4,2,1,1,2], [1,4,2,2,1,1],
    [2,4,1,2,1,1], [2,2,1,1,1,4], [4,1,3,1,1,1], [2,4,1,1,1,2], [1,3,4,1,1,1],
    [1,1,1,2,4,2], [1,2,1,1,4,2], [1,2,1,2,4,1], [1,1,4,2,1,2], [1,2,4,1,1,2],
    [1,2,4,2,1,1], [4,1,1,2,1,2], [4,2,1,1,1,2], [4,2,1,2,1,1], [2,1,2,1,4,1],
    [2,1,4,1,2,1], [4,1,2,1,2,1], [1,1,1,1,4,3], [1,1,1,3,4,1], [1,3,1,1,4,1],
    [1,1,4,1,1,3], [1,1,4,3,1,1], [4,1,1,1,1,3], [4,1,1,3,1,1], [1,1,3,1,4,1],
    [1,1,4,1,3,1], [3,1,1,1,4,1], [4,1,1,1,3,1], [2,1,1,4,1,2], [2,1,1,2,1,4],
    [2,1,1,2,3,2],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

impl CodeSet {
    fn fits(self, byte: u8) -> bool {
        match self {
            CodeSet::A => byte < 96,
            CodeSet::B => byte >= 32,
            CodeSet::C => false,
        }
    }

    fn value(self, byte: u8) -> u8 {
        match self {
            CodeSet::A if byte < 32 => byte + 64,
            _ => byte - 32,
        }
    }

    fn other(self) -> CodeSet {
        match self {
            CodeSet::A => CodeSet::B,
            _ => CodeSet::A,
        }
    }

    fn switch_code(self) -> u8 {
        match self {
            CodeSet::A => CODE_A,
            CodeSet::B => CODE_B,
            CodeSet::C => CODE_C,
        }
    }
}

/// Encode an ASCII value as Code 128 modules (start, data, checksum, stop).
pub fn encode(value: &str) -> Result<Vec<bool>, EncodeError> {
    let codes = symbol_values(value)?;
    let mut out = Vec::with_capacity(codes.len() * 11 + 13);
    for &code in &codes {
        push_widths(&mut out, &PATTERNS[usize::from(code)]);
    }
    push_widths(&mut out, &STOP);
    Ok(out)
}

/// Symbol values from the start code through the checksum, excluding stop.
pub fn symbol_values(value: &str) -> Result<Vec<u8>, EncodeError> {
    if value.is_empty() {
        return Err(EncodeError::Empty);
    }
    if let Some((position, ch)) = value.char_indices().find(|(_, c)| !c.is_ascii()) {
        return Err(EncodeError::InvalidChar { ch, position });
    }

    let mut codes = data_values(value.as_bytes());
    codes.push(checksum(&codes));
    Ok(codes)
}

fn checksum(codes: &[u8]) -> u8 {
    let sum = codes
        .iter()
        .enumerate()
        .map(|(i, &c)| u32::from(c) * (i.max(1) as u32))
        .sum::<u32>();
    (sum % 103) as u8
}

fn digit_run(bytes: &[u8], from: usize) -> usize {
    bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count()
}

fn initial_set(bytes: &[u8]) -> CodeSet {
    let lead = digit_run(bytes, 0);
    if lead >= 4 || (lead == 2 && bytes.len() == 2) {
        CodeSet::C
    } else if bytes[0] < 32 {
        CodeSet::A
    } else {
        CodeSet::B
    }
}

fn data_values(bytes: &[u8]) -> Vec<u8> {
    let mut set = initial_set(bytes);
    let mut codes = vec![match set {
        CodeSet::A => START_A,
        CodeSet::B => START_B,
        CodeSet::C => START_C,
    }];

    let mut pos = 0;
    while pos < bytes.len() {
        let run = digit_run(bytes, pos);

        if set == CodeSet::C {
            if run >= 2 {
                codes.push((bytes[pos] - b'0') * 10 + (bytes[pos + 1] - b'0'));
                pos += 2;
            } else {
                set = if bytes[pos] < 32 { CodeSet::A } else { CodeSet::B };
                codes.push(set.switch_code());
            }
            continue;
        }

        let reaches_end = pos + run == bytes.len();
        if run >= 6 || (run >= 4 && reaches_end) {
            if run % 2 == 1 {
                codes.push(set.value(bytes[pos]));
                pos += 1;
            }
            set = CodeSet::C;
            codes.push(CODE_C);
            continue;
        }

        let byte = bytes[pos];
        if set.fits(byte) {
            codes.push(set.value(byte));
        } else {
            let other = set.other();
            let next_needs_other = bytes
                .get(pos + 1)
                .is_some_and(|&n| !set.fits(n) && other.fits(n));
            if next_needs_other {
                codes.push(other.switch_code());
                set = other;
            } else {
                codes.push(SHIFT);
            }
            codes.push(other.value(byte));
        }
        pos += 1;
    }

    codes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_are_eleven_modules_wide() {
        for (i, p) in PATTERNS.iter().enumerate() {
            let sum: u8 = p.iter().sum();
            assert_eq!(sum, 11, "pattern {i}");
        }
        assert_eq!(STOP.iter().sum::<u8>(), 13);
    }

    #[test]
    fn text_uses_code_set_b() {
        let codes = symbol_values("PJJ123C").unwrap();
        assert_eq!(codes, [START_B, 48, 42, 42, 17, 18, 19, 35, 55]);
    }

    #[test]
    fn leading_digits_use_code_set_c() {
        let codes = symbol_values("123456").unwrap();
        assert_eq!(codes, [START_C, 12, 34, 56, 44]);
    }

    #[test]
    fn odd_digit_tail_switches_out_of_c() {
        let codes = symbol_values("12345").unwrap();
        assert_eq!(&codes[..5], &[START_C, 12, 34, CODE_B, 21]);
    }

    #[test]
    fn control_characters_start_in_code_set_a() {
        let codes = symbol_values("\tA").unwrap();
        assert_eq!(&codes[..3], &[START_A, 73, 33]);
    }

    #[test]
    fn single_control_character_uses_shift() {
        let codes = symbol_values("a\tb").unwrap();
        assert_eq!(&codes[..5], &[START_B, 65, SHIFT, 73, 66]);
    }

    #[test]
    fn trailing_digit_run_switches_to_c() {
        let codes = symbol_values("AB1234").unwrap();
        assert_eq!(&codes[..6], &[START_B, 33, 34, CODE_C, 12, 34]);
    }

    #[test]
    fn module_count_matches_symbol_count() {
        let modules = encode("ABC-123456").unwrap();
        let symbols = symbol_values("ABC-123456").unwrap().len();
        assert_eq!(modules.len(), symbols * 11 + 13);
        assert!(modules[0], "symbol starts with a bar");
        assert!(modules[modules.len() - 1], "symbol ends with a bar");
    }

    #[test]
    fn rejects_non_ascii() {
        assert_eq!(
            encode("né"),
            Err(EncodeError::InvalidChar { ch: 'é', position: 1 })
        );
        assert_eq!(encode(""), Err(EncodeError::Empty));
    }
}
