//! Logo inset for QR codes.
//!
//! The logo is scaled to fit a square inset centred on the symbol, clipped to
//! the requested shape, and painted over a solid pad that is slightly larger
//! than the inset so the surrounding modules keep a clean edge.

use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compose::overlay;
use crate::RenderError;

pub const LOGO_MIN_PCT: u32 = 10;
pub const LOGO_MAX_PCT: u32 = 30;
pub const LOGO_DEFAULT_PCT: u32 = 20;

/// How far the pad extends past the inset on every side.
pub const LOGO_PAD: u32 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoShape {
    /// No clipping.
    #[default]
    Original,
    Circle,
    /// Plain bounding box.
    Square,
}

/// A decoded logo plus its placement parameters.
#[derive(Debug, Clone)]
pub struct Logo {
    pub image: DynamicImage,
    pub shape: LogoShape,
    size_pct: u32,
}

impl Logo {
    /// `size_pct` is clamped to [`LOGO_MIN_PCT`]..=[`LOGO_MAX_PCT`].
    pub fn new(image: DynamicImage, shape: LogoShape, size_pct: u32) -> Self {
        Self {
            image,
            shape,
            size_pct: size_pct.clamp(LOGO_MIN_PCT, LOGO_MAX_PCT),
        }
    }

    /// Decode an uploaded logo (any format the `image` crate recognises).
    pub fn decode(bytes: &[u8], shape: LogoShape, size_pct: u32) -> Result<Self, RenderError> {
        let image = image::load_from_memory(bytes).map_err(RenderError::Logo)?;
        Ok(Self::new(image, shape, size_pct))
    }

    pub fn size_pct(&self) -> u32 {
        self.size_pct
    }

    /// Inset edge length for a symbol of the given width.
    pub fn inset_size(&self, symbol_width: u32) -> u32 {
        (symbol_width * self.size_pct / 100).max(1)
    }
}

/// Paint `logo` over the centre of `symbol`.
pub fn apply_logo(symbol: &mut RgbaImage, logo: &Logo, pad: Rgba<u8>) {
    let size = logo.inset_size(symbol.width());
    let x = symbol.width().saturating_sub(size) / 2;
    let y = symbol.height().saturating_sub(size) / 2;

    let mut inset = RgbaImage::from_pixel(size, size, pad);
    let fitted = fit_within(&logo.image, size).to_rgba8();
    overlay(
        &mut inset,
        &fitted,
        (size - fitted.width()) / 2,
        (size - fitted.height()) / 2,
    );
    if logo.shape == LogoShape::Circle {
        clip_circle(&mut inset);
    }

    match logo.shape {
        LogoShape::Circle => {
            let center = ((x + size / 2) as i32, (y + size / 2) as i32);
            draw_filled_circle_mut(symbol, center, (size / 2 + LOGO_PAD) as i32, pad);
        }
        LogoShape::Original | LogoShape::Square => {
            let rect = Rect::at(x as i32 - LOGO_PAD as i32, y as i32 - LOGO_PAD as i32)
                .of_size(size + LOGO_PAD * 2, size + LOGO_PAD * 2);
            draw_filled_rect_mut(symbol, rect, pad);
        }
    }

    overlay(symbol, &inset, x, y);
}

/// Scale an image to fit a `size`×`size` box, keeping its aspect ratio.
fn fit_within(img: &DynamicImage, size: u32) -> DynamicImage {
    let (orig_w, orig_h) = (img.width().max(1), img.height().max(1));
    let ratio = (f64::from(size) / f64::from(orig_w)).min(f64::from(size) / f64::from(orig_h));
    let new_w = ((f64::from(orig_w) * ratio).round() as u32).clamp(1, size);
    let new_h = ((f64::from(orig_h) * ratio).round() as u32).clamp(1, size);

    debug!(orig_w, orig_h, new_w, new_h, "Fitting logo into inset");
    img.resize_exact(new_w, new_h, FilterType::Lanczos3)
}

/// Make every pixel outside the inscribed circle fully transparent.
fn clip_circle(img: &mut RgbaImage) {
    let r = img.width() as f32 / 2.0;
    for (x, y, px) in img.enumerate_pixels_mut() {
        let dx = x as f32 + 0.5 - r;
        let dy = y as f32 + 0.5 - r;
        if dx * dx + dy * dy > r * r {
            px[3] = 0;
        }
    }
}
