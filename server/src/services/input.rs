//! Upload parsing and all-or-nothing batch validation.

use std::collections::HashSet;

use code_formats::FormatDescriptor;

/// Reasons an upload is rejected as a whole.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("The file contains no codes")]
    Empty,

    #[error("The file is not readable UTF-8 text")]
    Unreadable,

    #[error("Your plan allows up to {limit} codes per batch. The file contains {count} codes.")]
    LimitExceeded { limit: usize, count: usize },

    #[error("Invalid line: \"{line}\". {message}")]
    InvalidLine { line: String, message: String },

    #[error("Duplicate line: \"{line}\". Each code may appear only once per batch.")]
    DuplicateLine { line: String },

    #[error("A batch is being generated; wait for it to finish before uploading")]
    Busy,
}

/// Validated lines from one upload, in upload order.
#[derive(Debug, Clone)]
pub struct InputBatch {
    format: &'static FormatDescriptor,
    entries: Vec<String>,
}

impl InputBatch {
    /// Parse and validate `text` under `format`.
    ///
    /// The line count is checked against `limit` before any line is
    /// validated. Stored entries are normalised by the descriptor, and two
    /// lines that normalise to the same value reject the upload.
    pub fn parse(
        text: &str,
        format: &'static FormatDescriptor,
        limit: Option<usize>,
    ) -> Result<Self, ValidationError> {
        let lines = split_lines(text);
        if lines.is_empty() {
            return Err(ValidationError::Empty);
        }
        if let Some(limit) = limit {
            if lines.len() > limit {
                return Err(ValidationError::LimitExceeded {
                    limit,
                    count: lines.len(),
                });
            }
        }

        let mut entries = Vec::with_capacity(lines.len());
        let mut seen = HashSet::with_capacity(lines.len());
        for line in lines {
            let value = format.normalize(line);
            if !format.validate(&value) {
                return Err(ValidationError::InvalidLine {
                    line: line.to_string(),
                    message: format.error_message.to_string(),
                });
            }
            if !seen.insert(value.clone()) {
                return Err(ValidationError::DuplicateLine {
                    line: line.to_string(),
                });
            }
            entries.push(value);
        }

        Ok(Self { format, entries })
    }

    pub fn format(&self) -> &'static FormatDescriptor {
        self.format
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split on `\n`, trim every line, drop the empty ones.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Decode uploaded bytes as UTF-8 text, dropping a leading byte-order mark.
pub fn decode_upload(bytes: &[u8]) -> Result<String, ValidationError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ValidationError::Unreadable)?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}
