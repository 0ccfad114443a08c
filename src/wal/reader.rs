//! Log segment reader.
//!
//! Turns a whole log segment into the sequenced operations of its batches.

use super::batch::{BatchCursor, BatchHeader, WalBatch, WalOperation, BATCH_HEADER_SIZE};
use super::record::{RecordHeader, RecordType, BLOCK_SIZE, HEADER_SIZE};
use crate::config::WalFraming;
use crate::error::{Error, Result};
use crate::internal_key::ValueType;
use bytes::Bytes;
use std::fmt;
use std::path::Path;

/// A decode failure at a position in the segment.
#[derive(Debug)]
pub struct LogError {
    /// Offset of the physical record where the problem was found.
    pub offset: usize,
    /// What went wrong.
    pub error: Error,
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log record at {}: {}", self.offset, self.error)
    }
}

/// Everything recovered from one log segment.
#[derive(Debug, Default)]
pub struct LogContents {
    /// Operations in log order.
    pub operations: Vec<WalOperation>,
    /// Problems found along the way; operations before each are kept.
    pub errors: Vec<LogError>,
    /// Number of batches started.
    pub batches: usize,
}

impl LogContents {
    fn fail(&mut self, offset: usize, error: Error) {
        log::warn!("log record at {}: {}", offset, error);
        self.errors.push(LogError { offset, error });
    }

    fn extend_logged(&mut self, ops: Vec<WalOperation>) {
        for op in &ops {
            log::debug!(
                "  [{}] {} seq={}",
                if op.value_type == ValueType::Value { 'O' } else { 'X' },
                String::from_utf8_lossy(&op.user_key),
                op.sequence
            );
        }
        self.operations.extend(ops);
    }
}

/// Log reader over an in-memory segment
pub struct LogReader {
    data: Bytes,
    framing: WalFraming,
}

impl LogReader {
    /// Read a whole log segment into memory
    pub fn open<P: AsRef<Path>>(path: P, framing: WalFraming) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::new(Bytes::from(data), framing))
    }

    /// Wrap an in-memory segment
    pub fn new(data: Bytes, framing: WalFraming) -> Self {
        Self { data, framing }
    }

    /// Check if the segment is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode every batch in the segment
    pub fn read(&self) -> LogContents {
        match self.framing {
            WalFraming::Simple => self.read_simple(),
            WalFraming::Blocked => self.read_blocked(),
        }
    }

    /// Walk physical records back to back.
    ///
    /// Type 1 or 2 opens a batch; any other type feeds the operations still
    /// owed by the open batch. The cursor always advances by header plus
    /// declared length.
    fn read_simple(&self) -> LogContents {
        let data = &self.data[..];
        let mut contents = LogContents::default();
        let mut batch: Option<BatchCursor> = None;
        let mut pos = 0;

        while pos < data.len() {
            let Some(header) = RecordHeader::decode(&data[pos..]) else {
                contents.fail(pos, Error::format("log record header truncated"));
                break;
            };

            let start = pos + HEADER_SIZE;
            let end = (start + header.length as usize).min(data.len());
            let payload = &data[start..end];
            log::trace!(
                "log record at {}: type={} length={}",
                pos,
                header.record_type,
                header.length
            );

            let stream = if header.starts_batch() {
                match BatchHeader::decode(payload) {
                    Ok(batch_header) => {
                        log::debug!(
                            "batch at {}: seq={} count={}",
                            pos,
                            batch_header.sequence,
                            batch_header.count
                        );
                        contents.batches += 1;
                        batch = Some(BatchCursor::new(batch_header));
                        Some(&payload[BATCH_HEADER_SIZE..])
                    }
                    Err(e) => {
                        batch = None;
                        contents.fail(pos, e);
                        None
                    }
                }
            } else if batch.is_some() {
                Some(payload)
            } else {
                log::warn!("log record at {} continues no batch, skipped", pos);
                None
            };

            if let (Some(stream), Some(cursor)) = (stream, batch.as_mut()) {
                let mut ops = Vec::new();
                let result = cursor.consume(stream, &mut ops);
                contents.extend_logged(ops);
                if let Err(e) = result {
                    contents.fail(pos, e);
                    batch = None;
                }
            }

            pos += HEADER_SIZE + header.length as usize;
        }

        contents
    }

    /// Walk 32 KiB blocks and reassemble fragmented batches.
    fn read_blocked(&self) -> LogContents {
        let data = &self.data[..];
        let mut contents = LogContents::default();
        let mut assembled: Option<(usize, Vec<u8>)> = None;
        let mut block_start = 0;

        while block_start < data.len() {
            let block_end = (block_start + BLOCK_SIZE).min(data.len());
            let mut pos = block_start;

            while block_end - pos >= HEADER_SIZE {
                let Some(header) = RecordHeader::decode(&data[pos..block_end]) else {
                    break;
                };
                let start = pos + HEADER_SIZE;
                let end = start + header.length as usize;
                if end > block_end {
                    contents.fail(pos, Error::format("log record overruns its block"));
                    break;
                }
                let payload = &data[start..end];
                log::trace!(
                    "log record at {}: type={} length={}",
                    pos,
                    header.record_type,
                    header.length
                );

                match header.kind() {
                    Some(RecordType::Zero) => {}
                    Some(RecordType::Full) => {
                        if let Some((first, _)) = assembled.take() {
                            contents.fail(first, Error::format("fragmented batch never finished"));
                        }
                        self.decode_batch(&mut contents, pos, payload);
                    }
                    Some(RecordType::First) => {
                        if let Some((first, _)) = assembled.take() {
                            contents.fail(first, Error::format("fragmented batch never finished"));
                        }
                        assembled = Some((pos, payload.to_vec()));
                    }
                    Some(RecordType::Middle) => match assembled.as_mut() {
                        Some((_, buf)) => buf.extend_from_slice(payload),
                        None => contents.fail(pos, Error::format("middle fragment without first")),
                    },
                    Some(RecordType::Last) => match assembled.take() {
                        Some((first, mut buf)) => {
                            buf.extend_from_slice(payload);
                            self.decode_batch(&mut contents, first, &buf);
                        }
                        None => contents.fail(pos, Error::format("last fragment without first")),
                    },
                    None => {
                        assembled = None;
                        contents.fail(
                            pos,
                            Error::format(format!("unknown log record type {}", header.record_type)),
                        );
                    }
                }

                pos = end;
            }

            block_start = block_end;
        }

        if let Some((first, buf)) = assembled {
            contents.fail(first, Error::format("log ends inside a fragmented batch"));
            self.decode_batch(&mut contents, first, &buf);
        }

        contents
    }

    fn decode_batch(&self, contents: &mut LogContents, offset: usize, payload: &[u8]) {
        if let Ok(header) = BatchHeader::decode(payload) {
            log::debug!("batch at {}: seq={} count={}", offset, header.sequence, header.count);
            contents.batches += 1;
        }
        let decoded = WalBatch::decode(payload);
        contents.extend_logged(decoded.items);
        if let Some(e) = decoded.error {
            contents.fail(offset, e);
        }
    }
}

/// Decode a whole log segment held in memory.
pub fn read_log(data: Bytes, framing: WalFraming) -> LogContents {
    LogReader::new(data, framing).read()
}
