//! Built-in format table.

use crate::FormatDescriptor;

/// Smallest value a one-track pharmacode can carry.
pub const PHARMACODE_MIN: u32 = 3;

/// Largest value a one-track pharmacode can carry.
pub const PHARMACODE_MAX: u32 = 131_070;

static FORMATS: [FormatDescriptor; 5] = [
    FormatDescriptor::new(
        "CODE128",
        "Code 128",
        "High-density alphanumeric barcode",
        "CODE128",
        "ABC-123456",
        "Must contain only ASCII characters (letters, digits and symbols)",
        is_code128,
    ),
    FormatDescriptor::new(
        "ITF",
        "ITF",
        "Barcode for industrial packaging",
        "ITF",
        "123456789012",
        "Must contain exactly 12 digits",
        is_itf,
    ),
    FormatDescriptor::new(
        "CODE39",
        "Code 39",
        "Alphanumeric barcode common in logistics",
        "CODE39",
        "CODE-39",
        "Must contain only uppercase letters, digits and the characters - . space $ / + %",
        is_code39,
    ),
    FormatDescriptor::new(
        "MSI",
        "MSI",
        "Barcode used on shelf labels",
        "MSI",
        "123456",
        "Must contain only digits",
        is_digits,
    ),
    FormatDescriptor::new(
        "pharmacode",
        "Pharmacode",
        "Barcode used in pharmaceutical packaging",
        "pharmacode",
        "1234",
        "Must be a number between 3 and 131070",
        is_pharmacode,
    ),
];

/// Grammar for the QR batch generator: serial numbers made of digits.
///
/// Whitespace inside a line is ignored, so `"12 34"` is accepted and
/// normalised to `"1234"`.
pub static QR_SERIAL: FormatDescriptor = FormatDescriptor::new(
    "qr_serial",
    "QR Codes",
    "Numeric serials encoded as verification URLs",
    "QR",
    "000123",
    "Each line must contain only digits",
    is_qr_serial,
)
.with_normalizer(strip_whitespace);

/// All barcode formats in display order.
pub fn list_formats() -> &'static [FormatDescriptor] {
    &FORMATS
}

fn is_code128(value: &str) -> bool {
    !value.is_empty() && value.is_ascii()
}

fn is_itf(value: &str) -> bool {
    value.len() == 12 && is_digits(value)
}

fn is_code39(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| {
            b.is_ascii_digit()
                || b.is_ascii_uppercase()
                || matches!(b, b'-' | b'.' | b' ' | b'$' | b'/' | b'+' | b'%')
        })
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn is_pharmacode(value: &str) -> bool {
    if !is_digits(value) {
        return false;
    }
    // Overflowing values are far above the range anyway.
    value
        .parse::<u32>()
        .is_ok_and(|n| (PHARMACODE_MIN..=PHARMACODE_MAX).contains(&n))
}

fn is_qr_serial(value: &str) -> bool {
    is_digits(&strip_whitespace(value))
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}
