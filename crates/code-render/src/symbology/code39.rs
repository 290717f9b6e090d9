//! Code 39 without check character.

use super::{EncodeError, push_widths};

const WIDE: u8 = 2;
const START_STOP: &str = "nwnnwnwnn";

/// Nine-element patterns (`w` = wide, `n` = narrow), bars and spaces alternating.
#[rustfmt::skip]
const TABLE: [(char, &str); 44] = [
    ('0', "nnnwwnwnn"), ('1', "wnnwnnnnw"), ('2', "nnwwnnnnw"), ('3', "wnwwnnnnn"),
    ('4', "nnnwwnnnw"), ('5', "wnnwwnnnn"), ('6', "nnwwwnnnn"), ('7', "nnnwnnwnw"),
    ('8', "wnnwnnwnn"), ('9', "nnwwnnwnn"), ('A', "wnnnnwnnw"), ('B', "nnwnnwnnw"),
    ('C', "wnwnnwnnn"), ('D', "nnnnwwnnw"), ('E', "wnnnwwnnn"), ('F', "nnwnwwnnn"),
    ('G', "nnnnnwwnw"), ('H', "wnnnnwwnn"), ('I', "nnwnnwwnn"), ('J', "nnnnwwwnn"),
    ('K', "wnnnnnnww"), ('L', "nnwnnnnww"), ('M', "wnwnnnnwn"), ('N', "nnnnwnnww"),
    ('O', "wnnnwnnwn"), ('P', "nnwnwnnwn"), ('Q', "nnnnnnwww"), ('R', "wnnnnnwwn"),
    ('S', "nnwnnnwwn"), ('T', "nnnnwnwwn"), ('U', "wwnnnnnnw"), ('V', "nwwnnnnnw"),
    ('W', "wwwnnnnnn"), ('X', "nwnnwnnnw"), ('Y', "wwnnwnnnn"), ('Z', "nwwnwnnnn"),
    ('-', "nwnnnnwnw"), ('.', "wwnnnnwnn"), (' ', "nwwnnnwnn"), ('$', "nwnwnwnnn"),
    ('/', "nwnwnnnwn"), ('+', "nwnnnwnwn"), ('%', "nnnwnwnwn"), ('*', "nwnnwnwnn"),
];

fn pattern(ch: char) -> Option<&'static str> {
    TABLE.iter().find(|(c, _)| *c == ch).map(|(_, p)| *p)
}

fn push_char(out: &mut Vec<bool>, pattern: &str) {
    let widths: Vec<u8> = pattern
        .bytes()
        .map(|b| if b == b'w' { WIDE } else { 1 })
        .collect();
    push_widths(out, &widths);
}

/// Encode `*value*`, separating characters with a narrow space.
pub fn encode(value: &str) -> Result<Vec<bool>, EncodeError> {
    if value.is_empty() {
        return Err(EncodeError::Empty);
    }

    let mut patterns = Vec::with_capacity(value.len() + 2);
    patterns.push(START_STOP);
    for (position, ch) in value.char_indices() {
        match pattern(ch) {
            Some(p) if ch != '*' => patterns.push(p),
            _ => return Err(EncodeError::InvalidChar { ch, position }),
        }
    }
    patterns.push(START_STOP);

    let mut out = Vec::new();
    for (i, p) in patterns.iter().enumerate() {
        if i > 0 {
            out.push(false);
        }
        push_char(&mut out, p);
    }
    Ok(out)
}
