//! WAL Recovery
//!
//! Replays segments in order and heals a damaged tail.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;

use super::frame::{scan_segment, Corruption};
use super::segment::{list_segments, remove_segment, truncate_segment};
use super::Record;

/// Result of a recovery or verification pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Number of segment files scanned
    pub segments_scanned: usize,

    /// Number of records successfully recovered
    pub records_recovered: usize,

    /// Bytes past the last valid frame (removed, or removable when verifying)
    pub bytes_truncated: u64,

    /// Segment where scanning stopped on a bad frame
    pub truncated_segment: Option<PathBuf>,

    /// Segments after the damaged one (removed, or removable when verifying)
    pub segments_discarded: usize,

    /// What was wrong with the first bad frame
    pub corruption: Option<Corruption>,
}

impl RecoveryReport {
    /// Whether a damaged tail was found
    pub fn was_truncated(&self) -> bool {
        self.truncated_segment.is_some()
    }
}

/// Read every valid record across `segments`
///
/// A bad frame ends the scan and makes its segment the tail of the log. When
/// `heal` is set the segment is truncated to its valid prefix and every later
/// segment is deleted, so the next replay sees the same history.
pub(crate) fn replay_segments(
    segments: &[PathBuf],
    heal: bool,
) -> Result<(Vec<Record>, RecoveryReport)> {
    let mut records = Vec::new();
    let mut report = RecoveryReport::default();

    for (index, path) in segments.iter().enumerate() {
        let bytes = fs::read(path)?;
        let scan = scan_segment(&bytes);

        report.segments_scanned += 1;
        report.records_recovered += scan.records.len();
        records.extend(scan.records);

        if let Some(corruption) = scan.corruption {
            let dropped = (bytes.len() - scan.valid_len) as u64;
            let later = &segments[index + 1..];
            if heal {
                // Later segments go first, newest first: until the truncation
                // lands, the damaged frame still marks the tail on a rerun
                for stale in later.iter().rev() {
                    remove_segment(stale)?;
                }
                truncate_segment(path, scan.valid_len as u64)?;
            }
            warn!(
                segment = %path.display(),
                offset = scan.valid_len,
                dropped,
                later_segments = later.len(),
                reason = %corruption,
                healed = heal,
                "discarding damaged WAL tail"
            );

            report.bytes_truncated = dropped;
            report.segments_discarded = later.len();
            report.truncated_segment = Some(path.clone());
            report.corruption = Some(corruption);
            break;
        }
    }

    Ok((records, report))
}

/// Verify the log in `dir` without modifying it
pub fn verify(dir: &Path) -> Result<RecoveryReport> {
    let segments: Vec<PathBuf> = list_segments(dir)?
        .into_iter()
        .map(|(_, path)| path)
        .collect();

    let (_, report) = replay_segments(&segments, false)?;
    info!(
        dir = %dir.display(),
        segments = report.segments_scanned,
        records = report.records_recovered,
        damaged = report.was_truncated(),
        "verified WAL"
    );
    Ok(report)
}
