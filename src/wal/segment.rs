//! Segment Manager
//!
//! Owns the active segment file of a log directory.
//!
//! ## Responsibilities
//! - Discover existing segments on startup and resume at the newest
//! - Rotate to a new numbered segment when the size budget is exceeded
//! - Enumerate segments in creation order for replay
//! - Corrective truncation during recovery

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{DriftError, Result};

const SEGMENT_PREFIX: &str = "wal-";
const SEGMENT_SUFFIX: &str = ".log";

/// Tracks and writes the active segment
///
/// Rotation is a soft trigger: a flush that would push a non-empty segment
/// over `max_bytes` first moves to a new segment, and one flush never spans
/// two segments.
#[derive(Debug)]
pub struct SegmentManager {
    /// Log directory
    dir: PathBuf,

    /// Active segment handle, `None` once released
    active: Option<File>,

    /// Index of the active segment
    active_id: u64,

    /// Bytes currently in the active segment
    active_size: u64,

    /// Size budget per segment
    max_bytes: u64,
}

impl SegmentManager {
    /// Open the log directory and its active segment
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Discover existing segment files
    /// 3. Resume at the highest index, or start at 1
    pub fn open(dir: &Path, max_bytes: u64) -> Result<Self> {
        let open_err = |source| DriftError::Open {
            path: dir.to_path_buf(),
            source,
        };

        fs::create_dir_all(dir).map_err(open_err)?;
        let (active_id, file, active_size) = open_newest(dir).map_err(open_err)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            active: Some(file),
            active_id,
            active_size,
            max_bytes,
        })
    }

    /// Write `bytes` to the active segment and sync, rotating first if needed
    pub fn write_durable(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.needs_rotation(bytes.len()) {
            self.rotate()?;
        }

        let file = self.active_file()?;
        file.write_all(bytes)?;
        file.sync_all()?;
        self.active_size += bytes.len() as u64;

        debug!(
            segment = self.active_id,
            bytes = bytes.len(),
            size = self.active_size,
            "flushed buffer"
        );
        Ok(())
    }

    /// Whether `pending` more bytes would push a non-empty segment over budget
    pub fn needs_rotation(&self, pending: usize) -> bool {
        self.active_size > 0 && self.active_size + pending as u64 > self.max_bytes
    }

    /// Seal the active segment and open the next one
    pub fn rotate(&mut self) -> io::Result<()> {
        if let Some(file) = self.active.take() {
            file.sync_all()?;
        }

        let next_id = self.active_id + 1;
        let file = open_segment_file(&segment_path(&self.dir, next_id))?;

        debug!(sealed = self.active_id, active = next_id, "rotated segment");

        self.active = Some(file);
        self.active_id = next_id;
        self.active_size = 0;
        Ok(())
    }

    /// Sync and drop the active handle
    pub fn release(&mut self) -> io::Result<()> {
        match self.active.take() {
            Some(file) => file.sync_all(),
            None => Ok(()),
        }
    }

    /// Reattach to the newest segment on disk
    ///
    /// Recovery may truncate the active segment or remove it along with
    /// every segment after a damaged one.
    pub fn resume(&mut self) -> io::Result<()> {
        self.release()?;
        let (active_id, file, active_size) = open_newest(&self.dir)?;

        if active_id != self.active_id {
            debug!(previous = self.active_id, active = active_id, "resumed at earlier segment");
        }

        self.active = Some(file);
        self.active_id = active_id;
        self.active_size = active_size;
        Ok(())
    }

    /// All segments in creation order
    pub fn segments(&self) -> io::Result<Vec<PathBuf>> {
        Ok(list_segments(&self.dir)?
            .into_iter()
            .map(|(_, path)| path)
            .collect())
    }

    /// Path of the active segment
    pub fn active_path(&self) -> PathBuf {
        segment_path(&self.dir, self.active_id)
    }

    pub fn active_id(&self) -> u64 {
        self.active_id
    }

    pub fn active_size(&self) -> u64 {
        self.active_size
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn active_file(&mut self) -> io::Result<&mut File> {
        self.active
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no active segment"))
    }
}

// =============================================================================
// Directory Helpers
// =============================================================================

/// List segment files as `(index, path)`, ordered by index
pub fn list_segments(dir: &Path) -> io::Result<Vec<(u64, PathBuf)>> {
    let mut segments = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(id) = parse_segment_id(&path) {
            segments.push((id, path));
        }
    }

    // Numeric order keeps creation order past the padding width
    segments.sort_by_key(|(id, _)| *id);
    Ok(segments)
}

/// Shorten a segment to `len` bytes and sync it
pub fn truncate_segment(path: &Path, len: u64) -> io::Result<()> {
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(len)?;
    file.sync_all()
}

/// Delete a segment file
pub fn remove_segment(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

/// Open the highest-numbered segment, or segment 1 in an empty directory
///
/// Returns `(index, handle, size)`.
fn open_newest(dir: &Path) -> io::Result<(u64, File, u64)> {
    let id = list_segments(dir)?
        .last()
        .map(|(id, _)| *id)
        .unwrap_or(1);

    let file = open_segment_file(&segment_path(dir, id))?;
    let size = file.metadata()?.len();
    Ok((id, file, size))
}

/// Generate segment path given a directory and index
fn segment_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(format!("{}{:04}{}", SEGMENT_PREFIX, id, SEGMENT_SUFFIX))
}

/// Parse segment index from filename
/// "wal-0042.log" → Some(42)
fn parse_segment_id(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    let digits = name
        .strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(SEGMENT_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn open_segment_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .read(true)
        .open(path)
}
