//! Tests for the frame layer
//!
//! These tests verify (on in-memory bytes, no files):
//! - Frame header layout and checksum
//! - Scanning a clean sequence of frames
//! - Every corruption kind stops the scan at the start of the bad frame

use bytes::BytesMut;
use driftkv::wal::{
    frame_into, scan_one, scan_segment, wrap, Corruption, Record, ScanStep, FRAME_HEADER_SIZE,
    FRAME_MAGIC,
};
use driftkv::DriftError;

// =============================================================================
// Helper Functions
// =============================================================================

fn frame(record: &Record) -> Vec<u8> {
    wrap(&record.encode().unwrap())
}

fn frames(records: &[Record]) -> Vec<u8> {
    records.iter().flat_map(frame).collect()
}

fn sample_records() -> Vec<Record> {
    vec![
        Record::set("a", "1"),
        Record::set("b", "2"),
        Record::delete("a"),
    ]
}

// =============================================================================
// Wrap Tests
// =============================================================================

#[test]
fn test_wrap_header() {
    let payload = Record::set("key", "value").encode().unwrap();
    let bytes = wrap(&payload);

    assert_eq!(bytes.len(), FRAME_HEADER_SIZE + payload.len());
    assert_eq!(&bytes[0..4], &FRAME_MAGIC.to_be_bytes());
    assert_eq!(&bytes[4..8], &(payload.len() as u32).to_be_bytes());
    assert_eq!(&bytes[8..12], &crc32fast::hash(&payload).to_be_bytes());
    assert_eq!(&bytes[12..], payload.as_slice());
}

#[test]
fn test_frame_into_matches_wrap() {
    let record = Record::set("key", "value");
    let mut buf = BytesMut::from(&b"earlier"[..]);

    frame_into(&mut buf, |buf| record.encode_into(buf)).unwrap();

    assert_eq!(&buf[..7], b"earlier");
    assert_eq!(&buf[7..], wrap(&record.encode().unwrap()).as_slice());
}

#[test]
fn test_frame_into_error_leaves_buffer() {
    let mut buf = BytesMut::from(&b"earlier"[..]);

    let result = frame_into(&mut buf, |buf| {
        buf.extend_from_slice(b"partial");
        Err(DriftError::Encoding("too long".to_string()))
    });

    assert!(matches!(result, Err(DriftError::Encoding(_))));
    assert_eq!(&buf[..], b"earlier");
}

// =============================================================================
// Clean Scan Tests
// =============================================================================

#[test]
fn test_scan_empty() {
    let scan = scan_segment(&[]);

    assert!(scan.records.is_empty());
    assert_eq!(scan.valid_len, 0);
    assert!(!scan.needs_truncation());
}

#[test]
fn test_scan_clean_frames() {
    let records = sample_records();
    let bytes = frames(&records);

    let scan = scan_segment(&bytes);

    assert_eq!(scan.records, records);
    assert_eq!(scan.valid_len, bytes.len());
    assert!(scan.corruption.is_none());
}

#[test]
fn test_scan_one_advances() {
    let bytes = frames(&sample_records());
    let first_len = frame(&sample_records()[0]).len();

    match scan_one(&bytes, 0) {
        ScanStep::Record { record, next_offset } => {
            assert_eq!(record, Record::set("a", "1"));
            assert_eq!(next_offset, first_len);
        }
        other => panic!("Expected record, got {:?}", other),
    }

    assert!(matches!(scan_one(&bytes, bytes.len()), ScanStep::End));
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_scan_stops_at_bad_magic() {
    let mut bytes = frames(&sample_records()[..1]);
    let good_len = bytes.len();
    bytes.extend_from_slice(&0xDEAD_BEEFu32.to_be_bytes());
    bytes.extend_from_slice(&[0u8; 20]);

    let scan = scan_segment(&bytes);

    assert_eq!(scan.records.len(), 1);
    assert_eq!(scan.valid_len, good_len);
    assert_eq!(
        scan.corruption,
        Some(Corruption::BadMagic { found: 0xDEAD_BEEF })
    );
}

#[test]
fn test_scan_torn_header() {
    let mut bytes = frames(&sample_records()[..1]);
    let good_len = bytes.len();
    // Magic and half of the length field
    bytes.extend_from_slice(&FRAME_MAGIC.to_be_bytes());
    bytes.extend_from_slice(&[0, 0]);

    let scan = scan_segment(&bytes);

    assert_eq!(scan.records.len(), 1);
    assert_eq!(scan.valid_len, good_len);
    assert_eq!(scan.corruption, Some(Corruption::TornHeader { available: 6 }));
}

#[test]
fn test_scan_partial_magic_is_torn() {
    let mut bytes = frames(&sample_records()[..1]);
    let good_len = bytes.len();
    bytes.extend_from_slice(&FRAME_MAGIC.to_be_bytes()[..2]);

    let scan = scan_segment(&bytes);

    assert_eq!(scan.valid_len, good_len);
    assert_eq!(scan.corruption, Some(Corruption::TornHeader { available: 2 }));
}

#[test]
fn test_scan_trailing_garbage_byte() {
    let mut bytes = frames(&sample_records()[..1]);
    let good_len = bytes.len();
    bytes.push(0x00);

    let scan = scan_segment(&bytes);

    assert_eq!(scan.valid_len, good_len);
    assert!(matches!(scan.corruption, Some(Corruption::BadMagic { .. })));
}

#[test]
fn test_scan_torn_payload() {
    let records = sample_records();
    let mut bytes = frames(&records[..2]);
    let good_len = bytes.len();
    let mut torn = frame(&records[2]);
    torn.truncate(torn.len() - 3);
    bytes.extend_from_slice(&torn);

    let scan = scan_segment(&bytes);

    assert_eq!(scan.records, records[..2].to_vec());
    assert_eq!(scan.valid_len, good_len);
    assert!(matches!(
        scan.corruption,
        Some(Corruption::TornPayload { .. })
    ));
}

#[test]
fn test_scan_declared_length_past_end() {
    let mut bytes = frames(&sample_records()[..1]);
    let good_len = bytes.len();
    bytes.extend_from_slice(&FRAME_MAGIC.to_be_bytes());
    bytes.extend_from_slice(&1000u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(b"short");

    let scan = scan_segment(&bytes);

    assert_eq!(scan.valid_len, good_len);
    assert_eq!(
        scan.corruption,
        Some(Corruption::TornPayload {
            expected: 1000,
            available: 5
        })
    );
}

#[test]
fn test_scan_checksum_mismatch_in_middle() {
    let records = sample_records();
    let first_len = frame(&records[0]).len();
    let mut bytes = frames(&records);
    // Flip a payload byte of the second frame
    bytes[first_len + FRAME_HEADER_SIZE + 2] ^= 0xFF;

    let scan = scan_segment(&bytes);

    // Valid frames after the bad one are discarded too
    assert_eq!(scan.records, records[..1].to_vec());
    assert_eq!(scan.valid_len, first_len);
    assert!(matches!(
        scan.corruption,
        Some(Corruption::ChecksumMismatch { .. })
    ));
}

#[test]
fn test_scan_checksum_corruption_in_header() {
    let mut bytes = frames(&sample_records()[..1]);
    bytes[9] ^= 0x01;

    let scan = scan_segment(&bytes);

    assert!(scan.records.is_empty());
    assert_eq!(scan.valid_len, 0);
    assert!(matches!(
        scan.corruption,
        Some(Corruption::ChecksumMismatch { .. })
    ));
}

#[test]
fn test_scan_invalid_record_with_valid_checksum() {
    // Unknown op byte, but the frame checksum covers it correctly
    let mut payload = Record::set("k", "v").encode().unwrap();
    payload[0] = 9;
    let bytes = wrap(&payload);

    let scan = scan_segment(&bytes);

    assert!(scan.records.is_empty());
    assert_eq!(scan.valid_len, 0);
    assert!(matches!(scan.corruption, Some(Corruption::InvalidRecord(_))));
}
