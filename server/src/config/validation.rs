//! Setting value validation.

use regex::Regex;
use std::sync::LazyLock;

static RE_HTTP_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[A-Za-z0-9.\-]+(:[0-9]{1,5})?(/[^\s]*)?$").unwrap());

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "SERVER_PORT" => validate_int_range(value, 1, 65535)?,
        "CHUNK_SIZE" => validate_int_range(value, 1, 100_000)?,
        "CHUNK_COOLDOWN_MS" => validate_int_range(value, 0, 600_000)?,
        "DOWNLOAD_SHELF_CAPACITY" => validate_int_range(value, 1, 4096)?,
        "DOWNLOAD_MODE" => {
            if value != "shelf" && value != "directory" {
                return Err("must be 'shelf' or 'directory'".into());
            }
        }
        "QR_PAYLOAD_HOST" => {
            if !RE_HTTP_HOST.is_match(value) {
                return Err("must be an http(s) URL without whitespace".into());
            }
            if value.ends_with('/') {
                return Err("must not end with '/'".into());
            }
        }
        "FONT_PATH" => {
            let lower = value.to_lowercase();
            if !value.is_empty() && !lower.ends_with(".ttf") && !lower.ends_with(".otf") {
                return Err("must point to a .ttf or .otf file".into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_download_mode() {
        assert!(validate_setting("DOWNLOAD_MODE", "shelf").is_ok());
        assert!(validate_setting("DOWNLOAD_MODE", "directory").is_ok());
        assert!(validate_setting("DOWNLOAD_MODE", "browser").is_err());
    }

    #[test]
    fn test_valid_payload_host() {
        assert!(validate_setting("QR_PAYLOAD_HOST", "https://check.vant.plus").is_ok());
        assert!(validate_setting("QR_PAYLOAD_HOST", "http://localhost:8080/verify").is_ok());
        assert!(validate_setting("QR_PAYLOAD_HOST", "https://check.vant.plus/").is_err());
        assert!(validate_setting("QR_PAYLOAD_HOST", "ftp://example.com").is_err());
    }

    #[test]
    fn test_valid_chunk_settings() {
        assert!(validate_setting("CHUNK_SIZE", "2000").is_ok());
        assert!(validate_setting("CHUNK_SIZE", "0").is_err());
        assert!(validate_setting("CHUNK_COOLDOWN_MS", "0").is_ok());
        assert!(validate_setting("CHUNK_COOLDOWN_MS", "-1").is_err());
        assert!(validate_setting("CHUNK_COOLDOWN_MS", "abc").is_err());
    }

    #[test]
    fn test_valid_font_path() {
        assert!(validate_setting("FONT_PATH", "").is_ok());
        assert!(validate_setting("FONT_PATH", "/fonts/Mono.TTF").is_ok());
        assert!(validate_setting("FONT_PATH", "/fonts/mono.woff").is_err());
    }
}
