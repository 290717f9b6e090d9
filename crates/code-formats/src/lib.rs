//! Catalog of supported barcode symbologies and their input grammars.
//!
//! Every descriptor is a `'static` value built from a fixed table, so the
//! registry can be shared freely across threads without synchronisation.

pub mod catalog;

use serde::Serialize;

pub use catalog::{QR_SERIAL, list_formats};

/// Immutable description of one supported symbology.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatDescriptor {
    /// Stable identifier (e.g. `"CODE128"`).
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Encoder key understood by the renderer.
    pub format: &'static str,
    pub example: &'static str,
    pub error_message: &'static str,
    #[serde(skip)]
    validator: fn(&str) -> bool,
    #[serde(skip)]
    normalizer: Option<fn(&str) -> String>,
}

impl FormatDescriptor {
    pub(crate) const fn new(
        id: &'static str,
        name: &'static str,
        description: &'static str,
        format: &'static str,
        example: &'static str,
        error_message: &'static str,
        validator: fn(&str) -> bool,
    ) -> Self {
        Self {
            id,
            name,
            description,
            format,
            example,
            error_message,
            validator,
            normalizer: None,
        }
    }

    pub(crate) const fn with_normalizer(mut self, normalizer: fn(&str) -> String) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Check a single value against this format's grammar. Never panics.
    pub fn validate(&self, value: &str) -> bool {
        (self.validator)(value)
    }

    /// Canonical form of a value before it is encoded.
    ///
    /// Most formats encode the trimmed line as-is.
    pub fn normalize(&self, value: &str) -> String {
        match self.normalizer {
            Some(f) => f(value),
            None => value.to_string(),
        }
    }
}

impl PartialEq for FormatDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FormatDescriptor {}

/// Look up a barcode descriptor by its id. Ids are case-sensitive.
pub fn find_format(id: &str) -> Option<&'static FormatDescriptor> {
    list_formats().iter().find(|f| f.id == id)
}

/// Free-function form of [`FormatDescriptor::validate`].
pub fn validate(descriptor: &FormatDescriptor, value: &str) -> bool {
    descriptor.validate(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_format_returns_registered_descriptor() {
        let itf = find_format("ITF").unwrap();
        assert_eq!(itf.name, "ITF");
        assert_eq!(itf.format, "ITF");
    }

    #[test]
    fn find_format_is_case_sensitive() {
        assert!(find_format("itf").is_none());
        assert!(find_format("PHARMACODE").is_none());
        assert!(find_format("pharmacode").is_some());
    }

    #[test]
    fn descriptors_compare_by_id() {
        let a = find_format("MSI").unwrap();
        let b = *a;
        assert_eq!(*a, b);
        assert_ne!(*a, *find_format("ITF").unwrap());
    }

    #[test]
    fn normalize_defaults_to_identity() {
        let code39 = find_format("CODE39").unwrap();
        assert_eq!(code39.normalize("A B"), "A B");
    }
}
