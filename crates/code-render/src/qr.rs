//! QR code rasterization.

use ab_glyph::{Font, PxScale};
use image::{Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};
use serde::{Deserialize, Serialize};

use crate::color::parse_hex_color;
use crate::compose::overlay;
use crate::text::draw_centered_text;
use crate::RenderError;

/// Target symbol width in pixels.
pub const QR_TARGET_WIDTH: u32 = 400;

/// Quiet zone, in modules.
pub const QR_MARGIN: u32 = 2;

/// Extra height reserved under the symbol for a caption.
pub const CAPTION_SPACE: u32 = 40;

/// Gap between the symbol and the caption baseline box.
pub const CAPTION_OFFSET: u32 = 10;

pub const CAPTION_FONT_SIZE: f32 = 20.0;

/// Scale used when the target width is smaller than the symbol itself.
const FALLBACK_SCALE: f64 = 4.0;

/// Size and colours of a QR symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrStyle {
    pub width: u32,
    pub margin: u32,
    pub dark: String,
    pub light: String,
}

impl Default for QrStyle {
    fn default() -> Self {
        Self {
            width: QR_TARGET_WIDTH,
            margin: QR_MARGIN,
            dark: "#000000".into(),
            light: "#ffffff".into(),
        }
    }
}

/// Encode `data` at error-correction level M and rasterize it.
///
/// The whole symbol, quiet zone included, is stretched over `style.width`
/// pixels, so a module may be a fractional number of pixels wide.
pub fn generate_qr(data: &str, style: &QrStyle) -> Result<RgbaImage, RenderError> {
    let dark = parse_hex_color(&style.dark)?;
    let light = parse_hex_color(&style.light)?;
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
        .map_err(|e| RenderError::Qr(e.to_string()))?;

    let modules = code.to_colors();
    let module_count = code.width() as u32;
    let total = module_count + style.margin * 2;

    let (scale, img_size) = if style.width >= total {
        (f64::from(style.width) / f64::from(total), style.width)
    } else {
        (FALLBACK_SCALE, (f64::from(total) * FALLBACK_SCALE) as u32)
    };
    let margin_px = f64::from(style.margin) * scale;

    let mut img = RgbaImage::from_pixel(img_size, img_size, light);
    for y in 0..img_size {
        for x in 0..img_size {
            let mx = ((f64::from(x) - margin_px) / scale).floor();
            let my = ((f64::from(y) - margin_px) / scale).floor();
            if mx < 0.0 || my < 0.0 || mx >= f64::from(module_count) || my >= f64::from(module_count)
            {
                continue;
            }
            let idx = my as usize * module_count as usize + mx as usize;
            if modules[idx] == Color::Dark {
                img.put_pixel(x, y, dark);
            }
        }
    }

    Ok(img)
}

/// Extend `symbol` with [`CAPTION_SPACE`] pixels and draw `caption` centred below it.
pub fn add_caption<F: Font>(
    symbol: &RgbaImage,
    caption: &str,
    font: &F,
    ink: Rgba<u8>,
    paper: Rgba<u8>,
) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(symbol.width(), symbol.height() + CAPTION_SPACE, paper);
    overlay(&mut img, symbol, 0, 0);
    draw_centered_text(
        &mut img,
        font,
        PxScale::from(CAPTION_FONT_SIZE),
        (symbol.height() + CAPTION_OFFSET) as i32,
        caption,
        ink,
    );
    img
}
