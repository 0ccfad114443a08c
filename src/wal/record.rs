//! Physical log record format.
//!
//! Each record consists of:
//! - Checksum (4 bytes): read but never verified
//! - Length (2 bytes): little-endian length of the data
//! - Type (1 byte): Record type (Zero, Full, First, Middle, Last)
//! - Data (variable): a batch or a fragment of one

use bytes::{Buf, BufMut};

/// Size of the record header (checksum + length + type)
pub const HEADER_SIZE: usize = 7;

/// Size of a log block; records never straddle block boundaries
pub const BLOCK_SIZE: usize = 32 * 1024;

/// Record types for handling batches that span multiple blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// Preallocated, never written space
    Zero = 0,
    /// Complete record contained in a single block
    Full = 1,
    /// First fragment of a multi-block record
    First = 2,
    /// Middle fragment of a multi-block record
    Middle = 3,
    /// Last fragment of a multi-block record
    Last = 4,
}

impl RecordType {
    /// Convert from u8 to RecordType
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(RecordType::Zero),
            1 => Some(RecordType::Full),
            2 => Some(RecordType::First),
            3 => Some(RecordType::Middle),
            4 => Some(RecordType::Last),
            _ => None,
        }
    }
}

/// The fixed header in front of every physical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Stored checksum, not verified.
    pub checksum: u32,
    /// Length of the data that follows the header.
    pub length: u16,
    /// Raw type byte.
    pub record_type: u8,
}

impl RecordHeader {
    /// Decode a header from the front of `data`.
    ///
    /// Returns None if fewer than `HEADER_SIZE` bytes are available.
    pub fn decode(mut data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_SIZE {
            return None;
        }
        let checksum = data.get_u32_le();
        let length = data.get_u16_le();
        let record_type = data.get_u8();
        Some(Self { checksum, length, record_type })
    }

    /// Append the encoded header to `buf`
    pub fn encode_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.checksum);
        buf.put_u16_le(self.length);
        buf.put_u8(self.record_type);
    }

    /// The record type, if it is one of the known values
    pub fn kind(&self) -> Option<RecordType> {
        RecordType::from_u8(self.record_type)
    }

    /// Returns true if this record opens a new batch (Full or First)
    pub fn starts_batch(&self) -> bool {
        matches!(self.kind(), Some(RecordType::Full | RecordType::First))
    }

    /// Size of header plus data
    pub fn encoded_size(&self) -> usize {
        HEADER_SIZE + self.length as usize
    }
}

/// Encode a record with a zeroed checksum
///
/// Format: [checksum: u32][length: u16][type: u8][data: bytes]
pub fn encode_record(record_type: u8, data: &[u8]) -> Vec<u8> {
    assert!(data.len() <= u16::MAX as usize, "record data exceeds u16 length");
    let mut buf = Vec::with_capacity(HEADER_SIZE + data.len());
    let header = RecordHeader { checksum: 0, length: data.len() as u16, record_type };
    header.encode_to(&mut buf);
    buf.put_slice(data);
    buf
}
