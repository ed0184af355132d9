//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Frame every mutation before it becomes visible
//! - CRC32 checksums for corruption detection
//! - Batched, background and forced flushing with fsync
//! - Segment rotation by size
//! - Crash recovery and replay, truncating a torn or corrupt tail
//!
//! ## File Format
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │ Frame 1                                           │
//! │ ┌───────────┬────────────┬─────────┬────────────┐ │
//! │ │ Magic (4) │ Length (4) │ CRC (4) │  Payload   │ │
//! │ └───────────┴────────────┴─────────┴────────────┘ │
//! ├───────────────────────────────────────────────────┤
//! │ Frame 2                                           │
//! │ ┌───────────┬────────────┬─────────┬────────────┐ │
//! │ │ Magic (4) │ Length (4) │ CRC (4) │  Payload   │ │
//! │ └───────────┴────────────┴─────────┴────────────┘ │
//! └───────────────────────────────────────────────────┘
//!
//! Payload = [Op (1)][KeyLen (4)][ValLen (4)][Key][Value]
//! ```
//!
//! All integers are big-endian. Segments are named `wal-0001.log`,
//! `wal-0002.log`, ... and replayed in index order.

mod flusher;
mod frame;
mod log;
mod record;
mod recovery;
mod segment;

pub use frame::{
    frame_into, scan_one, scan_segment, wrap, wrap_into, Corruption, ScanStep, SegmentScan,
    FRAME_HEADER_SIZE, FRAME_MAGIC,
};
pub use log::{Lifecycle, Wal};
pub use record::{Operation, Record, RECORD_HEADER_SIZE};
pub use recovery::{verify, RecoveryReport};
pub use segment::{list_segments, SegmentManager};
