//! Log segment writer.
//!
//! Produces log segment bytes in memory, fragmenting batches across 32 KiB
//! blocks the way LevelDB does. Used to build fixtures for the reader.

use super::batch::WalBatch;
use super::record::{encode_record, RecordType, BLOCK_SIZE, HEADER_SIZE};

/// In-memory log segment writer
#[derive(Debug, Default)]
pub struct LogWriter {
    buffer: Vec<u8>,
    block_offset: usize,
}

impl LogWriter {
    /// Create an empty segment
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch as one logical record
    pub fn add_batch(&mut self, batch: &WalBatch) {
        self.add_record(&batch.encode());
    }

    /// Append a logical record
    ///
    /// Records that do not fit in the current block are split into
    /// First/Middle/Last fragments. Block tails too short for a header are
    /// zero filled.
    pub fn add_record(&mut self, data: &[u8]) {
        let mut left = data;
        let mut begin = true;

        loop {
            let leftover = BLOCK_SIZE - self.block_offset;
            if leftover < HEADER_SIZE {
                self.buffer.resize(self.buffer.len() + leftover, 0);
                self.block_offset = 0;
            }

            let avail = BLOCK_SIZE - self.block_offset - HEADER_SIZE;
            let fragment_len = left.len().min(avail);
            let end = fragment_len == left.len();

            let record_type = match (begin, end) {
                (true, true) => RecordType::Full,
                (true, false) => RecordType::First,
                (false, true) => RecordType::Last,
                (false, false) => RecordType::Middle,
            };

            self.buffer.extend(encode_record(record_type as u8, &left[..fragment_len]));
            self.block_offset += HEADER_SIZE + fragment_len;
            left = &left[fragment_len..];
            begin = false;

            if end {
                break;
            }
        }
    }

    /// Get the current segment size
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Return the segment bytes
    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }
}
