pub mod app;
pub mod config;
pub mod server;
pub mod services;

use ab_glyph::FontArc;

use config::AppConfig;
use services::font::FontService;

/// Load .env from multiple candidate paths.
pub fn load_dotenv() {
    let candidates = [".env", "../.env", "../../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}

/// Load config, prepare the data directory and resolve the caption font.
///
/// A missing font is not fatal: codes without captions still render.
pub fn init_foundation() -> Result<(AppConfig, Option<FontArc>), anyhow::Error> {
    load_dotenv();

    let config = AppConfig::load();
    std::fs::create_dir_all(&config.data_dir)?;
    tracing::info!(dir = %config.data_dir.display(), "Data directory ready");

    let font = match FontService::new(config.data_dir.clone(), config.font_path.clone()).load() {
        Ok(font) => Some(font),
        Err(e) => {
            tracing::warn!("Caption font unavailable, captions will fail: {e}");
            None
        }
    };

    tracing::info!(
        port = config.server_port,
        chunk_size = config.chunk_size,
        cooldown_ms = config.chunk_cooldown.as_millis() as u64,
        mode = ?config.download_mode,
        "Settings loaded"
    );
    Ok((config, font))
}
