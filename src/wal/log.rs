//! WAL handle
//!
//! Buffers framed records in memory and makes them durable on flush.
//!
//! ## Concurrency Model
//!
//! - The append buffer and the active segment sit behind one `Mutex`.
//!   Append, flush, rotation, replay and close each hold it for their whole
//!   critical section, so replay never sees a half-written flush.
//! - `append` only encodes into memory while holding the lock. Disk I/O
//!   happens in `flush`, in the background cycle and in `close`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use parking_lot::Mutex;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{DriftError, Result};

use super::flusher::Flusher;
use super::frame::frame_into;
use super::recovery::{replay_segments, RecoveryReport};
use super::segment::SegmentManager;
use super::Record;

/// Lifecycle of a handle: `Open → Closing → Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Open,
    Closing,
    Closed,
}

/// State shared with the flush thread
pub(crate) struct WalState {
    /// Framed records not yet written to disk
    buffer: BytesMut,

    /// Active segment and rotation bookkeeping
    segments: SegmentManager,

    lifecycle: Lifecycle,

    /// Set by the first failed flush; nothing is written afterwards
    poisoned: bool,
}

impl WalState {
    pub(crate) fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn ensure_open(&self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Open => Ok(()),
            Lifecycle::Closing | Lifecycle::Closed => Err(DriftError::Closed),
        }
    }

    /// Drain the buffer into the active segment and sync it
    pub(crate) fn flush(&mut self) -> Result<()> {
        if self.poisoned {
            return Err(DriftError::Poisoned);
        }
        if self.buffer.is_empty() {
            return Ok(());
        }

        match self.segments.write_durable(&self.buffer) {
            Ok(()) => {
                self.buffer.clear();
                Ok(())
            }
            Err(e) => {
                // The file may now hold part of the buffer; never write after it
                self.poisoned = true;
                error!(
                    segment = %self.segments.active_path().display(),
                    pending = self.buffer.len(),
                    error = %e,
                    "WAL flush failed, handle disabled"
                );
                Err(DriftError::Flush(e))
            }
        }
    }
}

/// A write-ahead log over a directory of segments
///
/// Records become durable only after a flush that included them: an explicit
/// `flush`, the background cycle, or `close`.
pub struct Wal {
    state: Arc<Mutex<WalState>>,
    flusher: Mutex<Option<Flusher>>,
    dir: PathBuf,
}

impl Wal {
    /// Open or create the log in `dir`
    pub fn open(
        dir: impl AsRef<Path>,
        flush_interval: Duration,
        max_segment_bytes: u64,
    ) -> Result<Self> {
        let config = Config::builder()
            .data_dir(dir.as_ref())
            .flush_interval(flush_interval)
            .max_segment_bytes(max_segment_bytes)
            .build();
        Self::open_config(&config)
    }

    /// Open or create the log described by `config`
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Open/create the directory and the active segment
    /// 3. Start the background flush cycle
    pub fn open_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let segments = SegmentManager::open(&config.data_dir, config.max_segment_bytes)?;
        info!(
            dir = %config.data_dir.display(),
            segment = segments.active_id(),
            size = segments.active_size(),
            "opened WAL"
        );

        let state = Arc::new(Mutex::new(WalState {
            buffer: BytesMut::with_capacity(config.buffer_capacity),
            segments,
            lifecycle: Lifecycle::Open,
            poisoned: false,
        }));

        let flusher = Flusher::spawn(Arc::clone(&state), config.flush_interval).map_err(
            |source| DriftError::Open {
                path: config.data_dir.clone(),
                source,
            },
        )?;

        Ok(Self {
            state,
            flusher: Mutex::new(Some(flusher)),
            dir: config.data_dir.clone(),
        })
    }

    /// Frame `record` into the append buffer
    ///
    /// Never touches the disk.
    pub fn append(&self, record: &Record) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        if state.poisoned {
            return Err(DriftError::Poisoned);
        }
        frame_into(&mut state.buffer, |buf| record.encode_into(buf))
    }

    /// Write and sync everything buffered so far
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.flush()
    }

    /// Same as [`Wal::flush`]
    pub fn force_flush(&self) -> Result<()> {
        self.flush()
    }

    /// All durable records in write order
    ///
    /// Unflushed appends are not included. A damaged tail is truncated
    /// instead of reported as an error.
    pub fn read_all(&self) -> Result<Vec<Record>> {
        self.recover().map(|(records, _)| records)
    }

    /// Like [`Wal::read_all`], also describing what was found on disk
    pub fn recover(&self) -> Result<(Vec<Record>, RecoveryReport)> {
        let mut state = self.state.lock();
        state.ensure_open()?;

        let segments = state.segments.segments()?;
        let (records, report) = replay_segments(&segments, true)?;

        // Healing may have shortened or removed the active segment
        if report.was_truncated() {
            state.segments.resume()?;
        }

        info!(
            segments = report.segments_scanned,
            records = report.records_recovered,
            truncated_bytes = report.bytes_truncated,
            "replayed WAL"
        );
        Ok((records, report))
    }

    /// Check the segments on disk without modifying them
    ///
    /// Holds the state lock, so the scan never sees a half-written flush.
    pub fn verify(&self) -> Result<RecoveryReport> {
        let state = self.state.lock();
        let segments = state.segments.segments()?;
        let (_, report) = replay_segments(&segments, false)?;

        info!(
            segments = report.segments_scanned,
            records = report.records_recovered,
            damaged = report.was_truncated(),
            "verified WAL"
        );
        Ok(report)
    }

    /// Stop the flush cycle, flush once more and release the segment
    ///
    /// Closing an already closed (or closing) handle is a no-op.
    pub fn close(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.lifecycle != Lifecycle::Open {
                return Ok(());
            }
            state.lifecycle = Lifecycle::Closing;
        }

        // The flush thread performs the final flush
        let flushed = match self.flusher.lock().take() {
            Some(flusher) => flusher.stop(),
            None => Ok(()),
        };

        let released = {
            let mut state = self.state.lock();
            let released = state.segments.release();
            state.lifecycle = Lifecycle::Closed;
            released
        };

        info!(dir = %self.dir.display(), "closed WAL");

        flushed?;
        released.map_err(DriftError::Flush)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Current lifecycle state
    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lock().lifecycle
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle() == Lifecycle::Closed
    }

    /// Bytes appended but not yet flushed
    pub fn buffered_bytes(&self) -> usize {
        self.state.lock().buffer.len()
    }

    /// Segment files in creation order
    pub fn segment_paths(&self) -> Result<Vec<PathBuf>> {
        Ok(self.state.lock().segments.segments()?)
    }

    /// Path of the segment currently appended to
    pub fn active_segment_path(&self) -> PathBuf {
        self.state.lock().segments.active_path()
    }

    /// Log directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for Wal {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!(dir = %self.dir.display(), error = %e, "failed to close WAL on drop");
        }
    }
}
