//! All setting definitions with their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

type DefTuple = (&'static str, &'static str, &'static str);

const DEFS: &[DefTuple] = &[
    ("SERVER_PORT", "8080", "HTTP listen port"),
    ("CODEBATCH_DATA_DIR", "", "Data directory (fonts, saved archives); empty = ~/.codebatch"),
    ("QR_PAYLOAD_HOST", "https://check.vant.plus", "URL prefix encoded into batch QR codes"),
    ("CHUNK_SIZE", "2000", "Items per archive"),
    ("CHUNK_COOLDOWN_MS", "10000", "Delay between archives in milliseconds"),
    ("DOWNLOAD_MODE", "shelf", "Archive delivery: 'shelf' (one-shot download) or 'directory'"),
    ("DOWNLOAD_SHELF_CAPACITY", "64", "Maximum archives waiting on the download shelf"),
    ("FONT_PATH", "", "Caption font override (TTF/OTF)"),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub description: &'static str,
}

/// Global setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    description,
                },
            )
        })
        .collect()
});

/// Get the default value for a setting key, or `None` if not defined.
pub fn get_default(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS.get(key).map(|d| d.default)
}
