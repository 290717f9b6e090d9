//! Tamper-evidence tags for QR payloads.
//!
//! The tag is `sha256(value ++ secret)` in lowercase hex. Anyone holding the
//! secret can recompute it, so it proves a code came from someone who knew the
//! secret. It is not a credential and offers no protection once the secret
//! leaks.

use sha2::{Digest, Sha256};

pub const DEFAULT_PAYLOAD_HOST: &str = "https://check.vant.plus";

/// Hex digest of `value` immediately followed by `secret`.
pub fn tag(value: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// `<host>/<value>-<tag>`.
pub fn payload_url(host: &str, value: &str, secret: &str) -> String {
    format!("{}/{}-{}", host.trim_end_matches('/'), value, tag(value, secret))
}
