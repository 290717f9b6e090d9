//! Runtime application configuration loaded from defaults + environment overrides.

use std::path::PathBuf;
use std::time::Duration;

use super::defaults::DEFAULT_SETTINGS;
use super::validation::validate_setting;

/// Where finished archives go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    /// Held in memory until fetched once over HTTP.
    Shelf,
    /// Written into `<data_dir>/downloads`.
    Directory,
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub qr_payload_host: String,
    pub chunk_size: usize,
    pub chunk_cooldown: Duration,
    pub download_mode: DownloadMode,
    pub download_shelf_capacity: usize,
    pub font_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 8080,
            data_dir: default_data_dir(),
            qr_payload_host: "https://check.vant.plus".into(),
            chunk_size: 2000,
            chunk_cooldown: Duration::from_millis(10_000),
            download_mode: DownloadMode::Shelf,
            download_shelf_capacity: 64,
            font_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Values failing [`validate_setting`] are logged and replaced by their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let g = |key: &str| -> String {
            let default = DEFAULT_SETTINGS.get(key).map(|d| d.default).unwrap_or("");
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => {
                    let v = v.trim().to_string();
                    match validate_setting(key, &v) {
                        Ok(()) => v,
                        Err(e) => {
                            tracing::warn!(key, value = %v, "Invalid setting ({e}), using default");
                            default.to_string()
                        }
                    }
                }
                _ => default.to_string(),
            }
        };

        let data_dir = {
            let d = g("CODEBATCH_DATA_DIR");
            if d.is_empty() { default_data_dir() } else { PathBuf::from(d) }
        };
        let font_path = {
            let p = g("FONT_PATH");
            if p.is_empty() { None } else { Some(PathBuf::from(p)) }
        };

        Self {
            server_port: parse_or(&g("SERVER_PORT"), 8080),
            data_dir,
            qr_payload_host: g("QR_PAYLOAD_HOST"),
            chunk_size: parse_or(&g("CHUNK_SIZE"), 2000),
            chunk_cooldown: Duration::from_millis(parse_or(&g("CHUNK_COOLDOWN_MS"), 10_000)),
            download_mode: match g("DOWNLOAD_MODE").as_str() {
                "directory" => DownloadMode::Directory,
                _ => DownloadMode::Shelf,
            },
            download_shelf_capacity: parse_or(&g("DOWNLOAD_SHELF_CAPACITY"), 64),
            font_path,
        }
    }

    /// Directory used by [`DownloadMode::Directory`].
    pub fn downloads_dir(&self) -> PathBuf {
        self.data_dir.join("downloads")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".codebatch")
}

fn parse_or<T: std::str::FromStr>(s: &str, default: T) -> T {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_with(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = load_with(&[]);
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.qr_payload_host, "https://check.vant.plus");
        assert_eq!(config.chunk_size, 2000);
        assert_eq!(config.chunk_cooldown, Duration::from_secs(10));
        assert_eq!(config.download_mode, DownloadMode::Shelf);
        assert_eq!(config.download_shelf_capacity, 64);
        assert!(config.font_path.is_none());
        assert!(config.data_dir.ends_with(".codebatch"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = load_with(&[
            ("SERVER_PORT", "9000"),
            ("CHUNK_SIZE", "5"),
            ("CHUNK_COOLDOWN_MS", "0"),
            ("DOWNLOAD_MODE", "directory"),
            ("CODEBATCH_DATA_DIR", "/tmp/cb"),
            ("FONT_PATH", "/fonts/a.ttf"),
        ]);
        assert_eq!(config.server_port, 9000);
        assert_eq!(config.chunk_size, 5);
        assert_eq!(config.chunk_cooldown, Duration::ZERO);
        assert_eq!(config.download_mode, DownloadMode::Directory);
        assert_eq!(config.downloads_dir(), PathBuf::from("/tmp/cb/downloads"));
        assert_eq!(config.font_path, Some(PathBuf::from("/fonts/a.ttf")));
    }

    #[test]
    fn invalid_values_fall_back_to_default() {
        let config = load_with(&[
            ("CHUNK_SIZE", "0"),
            ("DOWNLOAD_MODE", "email"),
            ("QR_PAYLOAD_HOST", "not a url"),
        ]);
        assert_eq!(config.chunk_size, 2000);
        assert_eq!(config.download_mode, DownloadMode::Shelf);
        assert_eq!(config.qr_payload_host, "https://check.vant.plus");
    }
}
