//! Caption drawing for rendered codes.

use ab_glyph::{Font, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use serde::{Deserialize, Serialize};

/// Horizontal placement of a caption within its box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Measure the pixel width of a string at the given font and scale.
pub fn measure_text_width<F: Font>(font: &F, scale: PxScale, text: &str) -> u32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = scaled.glyph_id(ch);
        if let Some(prev) = prev_glyph {
            width += scaled.kern(prev, glyph_id);
        }
        width += scaled.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    width.ceil().max(0.0) as u32
}

/// Draw `text` inside the horizontal box `[left, left + box_width)` at `y`.
#[allow(clippy::too_many_arguments)]
pub fn draw_aligned_text<F: Font>(
    img: &mut RgbaImage,
    font: &F,
    scale: PxScale,
    left: u32,
    box_width: u32,
    y: i32,
    text: &str,
    align: TextAlign,
    color: Rgba<u8>,
) {
    let text_width = measure_text_width(font, scale, text) as i32;
    let left = left as i32;
    let box_width = box_width as i32;
    let x = match align {
        TextAlign::Left => left,
        TextAlign::Center => left + (box_width - text_width).max(0) / 2,
        TextAlign::Right => left + (box_width - text_width).max(0),
    };
    draw_text_mut(img, color, x, y, scale, font, text);
}

/// Draw centered text across the full width of an image.
pub fn draw_centered_text<F: Font>(
    img: &mut RgbaImage,
    font: &F,
    scale: PxScale,
    y: i32,
    text: &str,
    color: Rgba<u8>,
) {
    let width = img.width();
    draw_aligned_text(img, font, scale, 0, width, y, text, TextAlign::Center, color);
}
