//! Raster output for linear barcodes and QR codes.
//!
//! Symbology encoders turn a value into modules, the `barcode` and `qr`
//! modules turn modules into RGBA images, and [`Rasterizer`] ties both
//! together behind one PNG-producing call used by the batch pipeline.

pub mod barcode;
pub mod color;
pub mod compose;
pub mod logo;
pub mod qr;
pub mod rasterizer;
pub mod symbology;
pub mod text;

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

// Re-exports for convenience
pub use barcode::{BarcodeOptions, TextPosition, render_barcode};
pub use logo::{Logo, LogoShape, apply_logo};
pub use qr::{QrStyle, add_caption, generate_qr};
pub use rasterizer::{BarcodeJob, QrJob, Rasterizer, RenderJob, SoftwareRasterizer};
pub use symbology::{EncodeError, Symbology, UnknownSymbology};
pub use text::TextAlign;

/// Errors that can occur while producing an image.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Cannot encode {value:?}: {reason}")]
    Encode {
        value: String,
        #[source]
        reason: EncodeError,
    },

    #[error("QR encode error: {0}")]
    Qr(String),

    #[error("No font available to draw the caption")]
    FontUnavailable,

    #[error("Invalid colour: {0}")]
    InvalidColor(String),

    #[error("Invalid render options: {0}")]
    InvalidOptions(String),

    #[error("Image encode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Logo could not be decoded: {0}")]
    Logo(#[source] image::ImageError),

    #[error(transparent)]
    UnknownSymbology(#[from] UnknownSymbology),
}

/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Encode an RGBA image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
pub(crate) fn test_font() -> ab_glyph::FontArc {
    ab_glyph::FontArc::try_from_slice(include_bytes!("../tests/fixtures/DejaVuSansMono.ttf"))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn encode_png_writes_signature() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([0, 0, 0, 255]));
        let bytes = encode_png(&img).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }

    #[test]
    fn encode_error_keeps_value_in_message() {
        let err = RenderError::Encode {
            value: "12a".into(),
            reason: EncodeError::InvalidChar { ch: 'a', position: 2 },
        };
        assert!(err.to_string().contains("\"12a\""));
    }
}
