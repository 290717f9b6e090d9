//! The single entry point the batch pipeline uses to turn a job into PNG bytes.

use ab_glyph::FontArc;
use image::Rgba;
use tracing::trace;

use crate::barcode::{BarcodeOptions, render_barcode};
use crate::color::parse_hex_color;
use crate::logo::{Logo, apply_logo};
use crate::qr::{QrStyle, add_caption, generate_qr};
use crate::symbology::Symbology;
use crate::{RenderError, encode_png};

/// Logo pads are white regardless of the symbol colours.
const LOGO_PAD_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A linear barcode to render.
#[derive(Debug, Clone)]
pub struct BarcodeJob {
    pub symbology: Symbology,
    pub value: String,
    pub options: BarcodeOptions,
}

/// A QR code to render.
#[derive(Debug, Clone)]
pub struct QrJob {
    /// Encoded content, usually the integrity URL.
    pub payload: String,
    /// Text drawn under the symbol.
    pub caption: Option<String>,
    pub style: QrStyle,
    pub logo: Option<Logo>,
}

#[derive(Debug, Clone)]
pub enum RenderJob {
    Barcode(BarcodeJob),
    Qr(QrJob),
}

impl RenderJob {
    /// The value a failure should be reported against.
    pub fn subject(&self) -> &str {
        match self {
            RenderJob::Barcode(job) => &job.value,
            RenderJob::Qr(job) => job.caption.as_deref().unwrap_or(&job.payload),
        }
    }
}

/// Something that can produce a PNG for a [`RenderJob`].
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, job: &RenderJob) -> Result<Vec<u8>, RenderError>;
}

/// CPU rasterizer built on `image`, `imageproc`, `ab_glyph` and `qrcode`.
#[derive(Clone, Default)]
pub struct SoftwareRasterizer {
    font: Option<FontArc>,
}

impl SoftwareRasterizer {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn barcode(&self, job: &BarcodeJob) -> Result<Vec<u8>, RenderError> {
        let modules = job
            .symbology
            .encode(&job.value)
            .map_err(|reason| RenderError::Encode {
                value: job.value.clone(),
                reason,
            })?;
        trace!(symbology = %job.symbology, modules = modules.len(), "Encoded barcode");
        let img = render_barcode(&modules, &job.value, &job.options, self.font.as_ref())?;
        encode_png(&img)
    }

    fn qr(&self, job: &QrJob) -> Result<Vec<u8>, RenderError> {
        let mut img = generate_qr(&job.payload, &job.style)?;
        if let Some(logo) = &job.logo {
            apply_logo(&mut img, logo, LOGO_PAD_COLOR);
        }
        if let Some(caption) = &job.caption {
            let font = self.font.as_ref().ok_or(RenderError::FontUnavailable)?;
            let ink = parse_hex_color(&job.style.dark)?;
            let paper = parse_hex_color(&job.style.light)?;
            img = add_caption(&img, caption, font, ink, paper);
        }
        encode_png(&img)
    }
}

impl std::fmt::Debug for SoftwareRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareRasterizer")
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl Rasterizer for SoftwareRasterizer {
    fn rasterize(&self, job: &RenderJob) -> Result<Vec<u8>, RenderError> {
        match job {
            RenderJob::Barcode(job) => self.barcode(job),
            RenderJob::Qr(job) => self.qr(job),
        }
    }
}
