//! WAL Record definitions
//!
//! A record is a single logical mutation. Layout (big-endian):
//!
//! ```text
//! ┌────────┬────────────┬────────────┬───────┬─────────┐
//! │ Op (1) │ KeyLen (4) │ ValLen (4) │  Key  │  Value  │
//! └────────┴────────────┴────────────┴───────┴─────────┘
//! ```

use bytes::{BufMut, BytesMut};

use crate::error::{DriftError, Result};

/// Fixed record header: Op (1) + KeyLen (4) + ValLen (4)
pub const RECORD_HEADER_SIZE: usize = 9;

/// Operations that can be logged
///
/// Values 3..=255 are reserved and rejected on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operation {
    /// Insert or overwrite a key
    Set = 1,

    /// Remove a key
    Delete = 2,
}

impl TryFrom<u8> for Operation {
    type Error = DriftError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(Operation::Set),
            2 => Ok(Operation::Delete),
            other => Err(DriftError::Decoding(format!(
                "Unknown operation: 0x{:02x}",
                other
            ))),
        }
    }
}

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The operation to perform
    pub op: Operation,

    /// Key bytes (may be empty)
    pub key: Vec<u8>,

    /// Value bytes, only meaningful for `Set`
    pub value: Vec<u8>,
}

impl Record {
    /// Build a `Set` record
    pub fn set(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            op: Operation::Set,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build a `Delete` record (empty value)
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Self {
            op: Operation::Delete,
            key: key.into(),
            value: Vec::new(),
        }
    }

    /// Value bytes as they go on disk. A delete never carries a value.
    fn stored_value(&self) -> &[u8] {
        match self.op {
            Operation::Set => &self.value,
            Operation::Delete => &[],
        }
    }

    /// Size of the encoded record in bytes
    pub fn encoded_len(&self) -> usize {
        RECORD_HEADER_SIZE + self.key.len() + self.stored_value().len()
    }

    /// Encode into a fresh buffer
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf)?;
        Ok(buf.to_vec())
    }

    /// Encode, appending to `buf`
    ///
    /// Nothing is written if any length overflows 32 bits, including the
    /// total, which has to fit the frame's length field.
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<()> {
        let value = self.stored_value();
        let key_len = length_u32("key", self.key.len())?;
        let val_len = length_u32("value", value.len())?;
        length_u32("record", self.encoded_len())?;

        buf.reserve(self.encoded_len());
        buf.put_u8(self.op as u8);
        buf.put_u32(key_len);
        buf.put_u32(val_len);
        buf.put_slice(&self.key);
        buf.put_slice(value);
        Ok(())
    }

    /// Decode a record that spans exactly `bytes`
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < RECORD_HEADER_SIZE {
            return Err(DriftError::Decoding(format!(
                "Incomplete header: expected {} bytes, got {}",
                RECORD_HEADER_SIZE,
                bytes.len()
            )));
        }

        let op = Operation::try_from(bytes[0])?;
        let key_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
        let val_len = u32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]) as usize;

        // Offsets come from the declared lengths only
        let body = &bytes[RECORD_HEADER_SIZE..];
        let declared = key_len.checked_add(val_len).ok_or_else(|| {
            DriftError::Decoding("Declared lengths overflow".to_string())
        })?;
        if declared != body.len() {
            return Err(DriftError::Decoding(format!(
                "Length mismatch: header declares {} bytes, {} present",
                declared,
                body.len()
            )));
        }

        let (key, value) = body.split_at(key_len);
        Ok(Self {
            op,
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }
}

fn length_u32(what: &str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        DriftError::Encoding(format!("{} length {} exceeds u32::MAX", what, len))
    })
}
