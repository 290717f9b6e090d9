//! CSS-style hex colour parsing.

use image::Rgba;

use crate::RenderError;

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
pub fn parse_hex_color(raw: &str) -> Result<Rgba<u8>, RenderError> {
    let hex = raw.trim().trim_start_matches('#');
    let invalid = || RenderError::InvalidColor(raw.to_string());

    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    match hex.len() {
        3 => {
            let expand = |i: usize| channel(&hex[i..=i].repeat(2));
            Ok(Rgba([expand(0)?, expand(1)?, expand(2)?, 255]))
        }
        6 | 8 => {
            let alpha = if hex.len() == 8 { channel(&hex[6..8])? } else { 255 };
            Ok(Rgba([
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                alpha,
            ]))
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_forms() {
        assert_eq!(parse_hex_color("#ffffff").unwrap(), Rgba([255, 255, 255, 255]));
        assert_eq!(parse_hex_color("#0a0").unwrap(), Rgba([0, 170, 0, 255]));
        assert_eq!(parse_hex_color("11223380").unwrap(), Rgba([0x11, 0x22, 0x33, 0x80]));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_hex_color("#12").is_err());
        assert!(parse_hex_color("#gggggg").is_err());
        assert!(parse_hex_color("red").is_err());
    }
}
