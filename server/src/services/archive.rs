//! ZIP packaging of rendered chunks.
//!
//! Every archive holds one folder named after its label, with one PNG per
//! rendered item inside it. Delivery is delegated to a [`DownloadSink`].

use std::io::{Cursor, Write};
use std::path::PathBuf;

use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::batch::ChunkRange;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One rendered code, ready to be packed exactly once.
#[derive(Debug, Clone)]
pub struct RenderedItem {
    pub value: String,
    pub entry_name: String,
    pub png: Vec<u8>,
    /// Full encoded payload (QR only).
    pub payload: Option<String>,
}

/// A finished archive.
#[derive(Debug, Clone)]
pub struct Archive {
    pub label: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub entries: usize,
}

/// Receipt for a delivered archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DownloadTicket {
    /// Written to disk.
    Saved {
        #[serde(rename = "fileName")]
        file_name: String,
        path: PathBuf,
    },
    /// Waiting on the shelf for a one-time fetch.
    Shelved {
        #[serde(rename = "fileName")]
        file_name: String,
        id: String,
        url: String,
    },
}

impl DownloadTicket {
    pub fn file_name(&self) -> &str {
        match self {
            DownloadTicket::Saved { file_name, .. } | DownloadTicket::Shelved { file_name, .. } => {
                file_name
            }
        }
    }
}

/// Final hop for a finished archive.
pub trait DownloadSink: Send + Sync {
    fn deliver(&self, archive: Archive) -> Result<DownloadTicket, ArchiveError>;
}

/// Pack `items` into a deflated ZIP under a folder named `label`.
pub fn pack(items: &[RenderedItem], label: &str) -> Result<Archive, ArchiveError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.add_directory(format!("{label}/"), options)?;
    for item in items {
        zip.start_file(format!("{label}/{}", item.entry_name), options)?;
        zip.write_all(&item.png)?;
    }
    let bytes = zip.finish()?.into_inner();

    tracing::debug!(label, entries = items.len(), size = bytes.len(), "Archive packed");
    Ok(Archive {
        label: label.to_string(),
        file_name: format!("{label}.zip"),
        bytes,
        entries: items.len(),
    })
}

/// `"<Format name> <start> - <end>"`.
pub fn barcode_label(format_name: &str, range: &ChunkRange) -> String {
    format!("{format_name} {} - {}", range.display_start, range.display_end)
}

/// `"QR Codes <start> - <end>"`.
pub fn qr_label(range: &ChunkRange) -> String {
    format!("QR Codes {} - {}", range.display_start, range.display_end)
}

pub fn barcode_entry_name(value: &str) -> String {
    format!("{value}.png")
}

pub fn qr_entry_name(value: &str) -> String {
    format!("qrcode_{value}.png")
}
