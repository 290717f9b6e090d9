//! Download sinks: a directory on disk, or an in-memory one-shot shelf.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::archive::{Archive, ArchiveError, DownloadSink, DownloadTicket};

/// Writes each archive to `<dir>/<file_name>`.
///
/// An existing file is never replaced: a later archive with the same name
/// is saved as `<stem> (2).zip`, `<stem> (3).zip` and so on.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, archive: Archive) -> Result<DownloadTicket, ArchiveError> {
        std::fs::create_dir_all(&self.dir)?;
        let (file_name, mut file) = create_unique(&self.dir, &archive.file_name)?;
        file.write_all(&archive.bytes)?;
        let path = self.dir.join(&file_name);
        tracing::info!(path = %path.display(), size = archive.bytes.len(), "Archive saved");
        Ok(DownloadTicket::Saved { file_name, path })
    }
}

fn create_unique(dir: &Path, file_name: &str) -> std::io::Result<(String, File)> {
    let name = Path::new(file_name);
    let stem = name.file_stem().map_or_else(|| file_name.into(), |s| s.to_string_lossy());
    let ext = name.extension().map(|e| e.to_string_lossy());

    let mut candidate = file_name.to_string();
    for n in 2u32.. {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(&candidate))
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                candidate = match &ext {
                    Some(ext) => format!("{stem} ({n}).{ext}"),
                    None => format!("{stem} ({n})"),
                };
            }
            Err(e) => return Err(e),
        }
    }
    Err(ErrorKind::AlreadyExists.into())
}

/// Bounded in-memory store of archives awaiting a single download.
///
/// Taking an archive removes it. When the shelf is full, the oldest
/// archive is evicted to make room.
pub struct DownloadShelf {
    capacity: usize,
    slots: Mutex<VecDeque<(String, Archive)>>,
}

impl DownloadShelf {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            slots: Mutex::new(VecDeque::new()),
        }
    }

    /// Remove and return the archive stored under `id`.
    pub fn take(&self, id: &str) -> Option<Archive> {
        let mut slots = self.lock();
        let pos = slots.iter().position(|(slot_id, _)| slot_id == id)?;
        slots.remove(pos).map(|(_, archive)| archive)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<(String, Archive)>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DownloadSink for DownloadShelf {
    fn deliver(&self, archive: Archive) -> Result<DownloadTicket, ArchiveError> {
        let id = uuid::Uuid::new_v4().to_string();
        let file_name = archive.file_name.clone();
        let mut slots = self.lock();
        while slots.len() >= self.capacity {
            if let Some((old_id, old)) = slots.pop_front() {
                tracing::warn!(id = %old_id, file = %old.file_name, "Download shelf full, evicting oldest archive");
            }
        }
        slots.push_back((id.clone(), archive));
        tracing::info!(id = %id, file = %file_name, pending = slots.len(), "Archive shelved");

        Ok(DownloadTicket::Shelved {
            url: format!("/api/downloads/{id}"),
            file_name,
            id,
        })
    }
}
