//! Linear barcode rasterization.
//!
//! Layout follows the classic web generator conventions: bars are `width`
//! pixels per module and `height` pixels tall, the human-readable value sits
//! above or below the bars, and each side has its own margin.

use ab_glyph::{Font, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::color::parse_hex_color;
use crate::text::{TextAlign, draw_aligned_text, measure_text_width};
use crate::RenderError;

const MAX_MODULE_WIDTH: u32 = 20;
const MAX_BAR_HEIGHT: u32 = 2000;
const MAX_FONT_SIZE: u32 = 200;
const MAX_MARGIN: u32 = 500;
const MAX_IMAGE_PIXELS: u64 = 50_000_000;

/// Where the human-readable value is drawn relative to the bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextPosition {
    Top,
    #[default]
    Bottom,
}

/// Style options for a rendered barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BarcodeOptions {
    /// Pixels per module.
    pub width: u32,
    /// Bar height in pixels.
    pub height: u32,
    pub display_value: bool,
    pub text_align: TextAlign,
    pub text_position: TextPosition,
    pub text_margin: u32,
    pub font_size: u32,
    pub background: String,
    pub line_color: String,
    /// Margin used for any side without its own override.
    pub margin: u32,
    pub margin_top: Option<u32>,
    pub margin_bottom: Option<u32>,
    pub margin_left: Option<u32>,
    pub margin_right: Option<u32>,
}

impl Default for BarcodeOptions {
    fn default() -> Self {
        Self {
            width: 2,
            height: 100,
            display_value: true,
            text_align: TextAlign::Center,
            text_position: TextPosition::Bottom,
            text_margin: 2,
            font_size: 20,
            background: "#ffffff".into(),
            line_color: "#000000".into(),
            margin: 10,
            margin_top: None,
            margin_bottom: None,
            margin_left: None,
            margin_right: None,
        }
    }
}

/// Resolved four-sided margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl BarcodeOptions {
    pub fn margins(&self) -> Margins {
        Margins {
            top: self.margin_top.unwrap_or(self.margin),
            bottom: self.margin_bottom.unwrap_or(self.margin),
            left: self.margin_left.unwrap_or(self.margin),
            right: self.margin_right.unwrap_or(self.margin),
        }
    }

    /// Reject sizes that are zero or large enough to exhaust memory.
    pub fn check(&self) -> Result<(), RenderError> {
        let bad = |msg: String| Err(RenderError::InvalidOptions(msg));
        if !(1..=MAX_MODULE_WIDTH).contains(&self.width) {
            return bad(format!("bar width must be between 1 and {MAX_MODULE_WIDTH}"));
        }
        if !(1..=MAX_BAR_HEIGHT).contains(&self.height) {
            return bad(format!("height must be between 1 and {MAX_BAR_HEIGHT}"));
        }
        if self.display_value && !(1..=MAX_FONT_SIZE).contains(&self.font_size) {
            return bad(format!("font size must be between 1 and {MAX_FONT_SIZE}"));
        }
        let m = self.margins();
        if [m.top, m.bottom, m.left, m.right, self.text_margin]
            .iter()
            .any(|&v| v > MAX_MARGIN)
        {
            return bad(format!("margins must not exceed {MAX_MARGIN}"));
        }
        Ok(())
    }
}

/// Rasterize a module sequence, optionally with its value as a caption.
///
/// `font` is required when `options.display_value` is set.
pub fn render_barcode<F: Font>(
    modules: &[bool],
    value: &str,
    options: &BarcodeOptions,
    font: Option<&F>,
) -> Result<RgbaImage, RenderError> {
    options.check()?;
    let background = parse_hex_color(&options.background)?;
    let line = parse_hex_color(&options.line_color)?;
    let margins = options.margins();

    let caption = if options.display_value {
        let font = font.ok_or(RenderError::FontUnavailable)?;
        let scale = PxScale::from(options.font_size as f32);
        Some((font, scale, measure_text_width(font, scale, value)))
    } else {
        None
    };

    let too_large = || RenderError::InvalidOptions("barcode image too large".into());
    let bars_width = u32::try_from(modules.len())
        .ok()
        .and_then(|n| n.checked_mul(options.width))
        .ok_or_else(too_large)?;
    let text_width = caption.as_ref().map_or(0, |(_, _, w)| *w);
    let content_width = bars_width.max(text_width);
    let text_block = if caption.is_some() {
        options.font_size + options.text_margin
    } else {
        0
    };

    let img_width = content_width
        .checked_add(margins.left + margins.right)
        .ok_or_else(too_large)?;
    let img_height = options.height + text_block + margins.top + margins.bottom;
    if u64::from(img_width) * u64::from(img_height) > MAX_IMAGE_PIXELS {
        return Err(too_large());
    }
    let mut img = RgbaImage::from_pixel(img_width.max(1), img_height.max(1), background);

    let bars_top = match options.text_position {
        TextPosition::Top => margins.top + text_block,
        TextPosition::Bottom => margins.top,
    };
    let padding = match options.text_align {
        TextAlign::Left => 0,
        TextAlign::Center => (content_width - bars_width) / 2,
        TextAlign::Right => content_width - bars_width,
    };
    draw_bars(
        &mut img,
        modules,
        margins.left + padding,
        bars_top,
        options.width,
        options.height,
        line,
    );

    if let Some((font, scale, _)) = caption {
        let text_y = match options.text_position {
            TextPosition::Top => margins.top,
            TextPosition::Bottom => bars_top + options.height + options.text_margin,
        };
        draw_aligned_text(
            &mut img,
            font,
            scale,
            margins.left,
            content_width,
            text_y as i32,
            value,
            options.text_align,
            line,
        );
    }

    Ok(img)
}

fn draw_bars(
    img: &mut RgbaImage,
    modules: &[bool],
    left: u32,
    top: u32,
    module_width: u32,
    height: u32,
    color: Rgba<u8>,
) {
    let mut i = 0;
    while i < modules.len() {
        if !modules[i] {
            i += 1;
            continue;
        }
        let run = modules[i..].iter().take_while(|&&m| m).count();
        let x = left + i as u32 * module_width;
        let rect = Rect::at(x as i32, top as i32).of_size(run as u32 * module_width, height);
        draw_filled_rect_mut(img, rect, color);
        i += run;
    }
}
