//! Caption font discovery.

use std::path::{Path, PathBuf};

use ab_glyph::FontArc;

const VALID_EXTENSIONS: &[&str] = &[".ttf", ".otf"];

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("Invalid font data in {0}")]
    InvalidFont(PathBuf),
    #[error("No usable caption font found (set FONT_PATH or install system fonts)")]
    NotFound,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves the font used for barcode values and QR captions.
///
/// Lookup order: explicit override, then the first TTF/OTF in
/// `<data_dir>/fonts`, then well-known system fonts.
#[derive(Clone)]
pub struct FontService {
    data_dir: PathBuf,
    override_path: Option<PathBuf>,
}

impl FontService {
    pub fn new(data_dir: PathBuf, override_path: Option<PathBuf>) -> Self {
        Self {
            data_dir,
            override_path,
        }
    }

    fn fonts_dir(&self) -> PathBuf {
        self.data_dir.join("fonts")
    }

    /// Find the font installed under the data directory, if any.
    fn find_custom_font(&self) -> Option<PathBuf> {
        let entries = std::fs::read_dir(self.fonts_dir()).ok()?;
        let mut fonts: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && has_font_extension(p))
            .collect();
        fonts.sort();
        fonts.into_iter().next()
    }

    /// Load the caption font.
    pub fn load(&self) -> Result<FontArc, FontError> {
        if let Some(path) = &self.override_path {
            return load_font_file(path);
        }
        if let Some(path) = self.find_custom_font() {
            return load_font_file(&path);
        }
        for path in system_font_candidates() {
            if let Ok(font) = load_font_file(Path::new(path)) {
                tracing::info!(path = %path, "Using system font for captions");
                return Ok(font);
            }
        }
        Err(FontError::NotFound)
    }
}

fn has_font_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .is_some_and(|ext| VALID_EXTENSIONS.contains(&ext.as_str()))
}

fn load_font_file(path: &Path) -> Result<FontArc, FontError> {
    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data).map_err(|_| FontError::InvalidFont(path.to_path_buf()))?;
    tracing::debug!(path = %path.display(), "Caption font loaded");
    Ok(font)
}

fn system_font_candidates() -> &'static [&'static str] {
    #[cfg(target_os = "macos")]
    {
        &[
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "/System/Library/Fonts/Supplemental/Courier New.ttf",
            "/System/Library/Fonts/Helvetica.ttc",
        ]
    }
    #[cfg(target_os = "windows")]
    {
        &[
            "C:\\Windows\\Fonts\\arial.ttf",
            "C:\\Windows\\Fonts\\consola.ttf",
        ]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        &[
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        ]
    }
}
