//! WAL Frame layer
//!
//! Wraps an encoded record in a self-validating envelope and scans segment
//! bytes back into records.
//!
//! Scanning works on a byte slice, not a file handle: `scan_segment` returns
//! the valid records together with the length of the valid prefix, and the
//! caller decides whether to truncate the file to that length.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::error::{DriftError, Result};

use super::Record;

/// Magic tag at the start of every frame ("DRKV")
pub const FRAME_MAGIC: u32 = 0x4452_4B56;

/// Frame header: Magic (4) + Length (4) + Checksum (4)
pub const FRAME_HEADER_SIZE: usize = 12;

/// Append a frame around `payload` to `buf`
///
/// `payload.len()` must fit in a u32; `Record::encode_into` enforces this.
pub fn wrap_into(buf: &mut BytesMut, payload: &[u8]) {
    buf.reserve(FRAME_HEADER_SIZE + payload.len());
    buf.put_u32(FRAME_MAGIC);
    buf.put_u32(payload.len() as u32);
    buf.put_u32(crc32fast::hash(payload));
    buf.put_slice(payload);
}

/// Append a frame whose payload `write_payload` encodes in place
///
/// The header is reserved up front and filled in once the payload's length
/// and checksum are known. On error `buf` is left as it was.
pub fn frame_into<F>(buf: &mut BytesMut, write_payload: F) -> Result<()>
where
    F: FnOnce(&mut BytesMut) -> Result<()>,
{
    let start = buf.len();
    let payload_start = start + FRAME_HEADER_SIZE;
    buf.put_bytes(0, FRAME_HEADER_SIZE);

    if let Err(e) = write_payload(&mut *buf) {
        buf.truncate(start);
        return Err(e);
    }

    let payload = &buf[payload_start..];
    let checksum = crc32fast::hash(payload);
    let length = match u32::try_from(payload.len()) {
        Ok(length) => length,
        Err(_) => {
            let len = payload.len();
            buf.truncate(start);
            return Err(DriftError::Encoding(format!(
                "frame payload of {} bytes exceeds u32::MAX",
                len
            )));
        }
    };

    let header = &mut buf[start..payload_start];
    header[0..4].copy_from_slice(&FRAME_MAGIC.to_be_bytes());
    header[4..8].copy_from_slice(&length.to_be_bytes());
    header[8..12].copy_from_slice(&checksum.to_be_bytes());
    Ok(())
}

/// Build a standalone frame around `payload`
pub fn wrap(payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
    wrap_into(&mut buf, payload);
    buf.to_vec()
}

/// Why a frame failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
    /// Bytes at the frame start are not the magic tag
    BadMagic { found: u32 },

    /// Fewer than a full header remains
    TornHeader { available: usize },

    /// Header declares more payload than remains
    TornPayload { expected: usize, available: usize },

    /// Payload does not match the stored CRC
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Payload checksums fine but is not a valid record
    InvalidRecord(String),
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Corruption::BadMagic { found } => write!(f, "bad magic 0x{:08x}", found),
            Corruption::TornHeader { available } => {
                write!(f, "torn header ({} of {} bytes)", available, FRAME_HEADER_SIZE)
            }
            Corruption::TornPayload { expected, available } => {
                write!(f, "torn payload ({} of {} bytes)", available, expected)
            }
            Corruption::ChecksumMismatch { expected, actual } => write!(
                f,
                "checksum mismatch (stored 0x{:08x}, computed 0x{:08x})",
                expected, actual
            ),
            Corruption::InvalidRecord(reason) => write!(f, "invalid record: {}", reason),
        }
    }
}

/// Outcome of scanning one frame
#[derive(Debug)]
pub enum ScanStep {
    /// A valid frame; the next one starts at `next_offset`
    Record { record: Record, next_offset: usize },

    /// Offset is exactly at the end of the data
    End,

    /// Everything from `offset` on is untrusted
    Truncate { offset: usize, corruption: Corruption },
}

/// Validate and unwrap the frame starting at `offset`
pub fn scan_one(bytes: &[u8], offset: usize) -> ScanStep {
    let rest = bytes.get(offset..).unwrap_or_default();
    if rest.is_empty() {
        return ScanStep::End;
    }

    let truncate = |corruption| ScanStep::Truncate { offset, corruption };

    // Even a partial magic has to match before we call the frame torn
    let magic_len = rest.len().min(4);
    if rest[..magic_len] != FRAME_MAGIC.to_be_bytes()[..magic_len] {
        return truncate(Corruption::BadMagic {
            found: partial_u32(rest),
        });
    }
    if rest.len() < FRAME_HEADER_SIZE {
        return truncate(Corruption::TornHeader { available: rest.len() });
    }

    let length = read_u32(rest, 4) as usize;
    let expected_crc = read_u32(rest, 8);

    let payload = match rest[FRAME_HEADER_SIZE..].get(..length) {
        Some(payload) => payload,
        None => {
            return truncate(Corruption::TornPayload {
                expected: length,
                available: rest.len() - FRAME_HEADER_SIZE,
            })
        }
    };

    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return truncate(Corruption::ChecksumMismatch {
            expected: expected_crc,
            actual: actual_crc,
        });
    }

    match Record::decode(payload) {
        Ok(record) => ScanStep::Record {
            record,
            next_offset: offset + FRAME_HEADER_SIZE + length,
        },
        Err(e) => truncate(Corruption::InvalidRecord(e.to_string())),
    }
}

/// Result of scanning a whole segment
#[derive(Debug, Default)]
pub struct SegmentScan {
    /// Records from the valid prefix, in write order
    pub records: Vec<Record>,

    /// Length of the valid prefix in bytes
    pub valid_len: usize,

    /// Set when the scan stopped before the end of the data
    pub corruption: Option<Corruption>,
}

impl SegmentScan {
    /// Whether bytes past `valid_len` must be discarded
    pub fn needs_truncation(&self) -> bool {
        self.corruption.is_some()
    }
}

/// Scan frames from offset 0 until the end of data or the first bad frame
pub fn scan_segment(bytes: &[u8]) -> SegmentScan {
    let mut scan = SegmentScan::default();
    let mut offset = 0;

    loop {
        match scan_one(bytes, offset) {
            ScanStep::Record { record, next_offset } => {
                scan.records.push(record);
                offset = next_offset;
            }
            ScanStep::End => break,
            ScanStep::Truncate { offset: bad, corruption } => {
                offset = bad;
                scan.corruption = Some(corruption);
                break;
            }
        }
    }

    scan.valid_len = offset;
    scan
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// First four bytes as a u32, zero-padded when fewer remain
fn partial_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    let n = bytes.len().min(4);
    word[..n].copy_from_slice(&bytes[..n]);
    u32::from_be_bytes(word)
}
