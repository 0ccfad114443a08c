//! Write batch payloads carried by log records.
//!
//! ```text
//! [sequence_base: u64 LE][count: u32 LE][op 1]...[op N]
//!
//! op = [tag: u8] [key_len: varint] [key] ([value_len: varint] [value] if tag == 1)
//! ```
//!
//! Operations take consecutive sequence numbers starting at `sequence_base`,
//! deletions included.

use crate::coding::{get_length, put_varint};
use crate::error::{Error, Partial, Result};
use crate::internal_key::{InternalKey, Record, ValueType, MAX_SEQUENCE};
use bytes::{Buf, BufMut};

/// Size of the sequence and count header in front of the operations
pub const BATCH_HEADER_SIZE: usize = 12;

/// Sequence base and operation count of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchHeader {
    /// Sequence number of the first operation
    pub sequence: u64,
    /// Number of operations in the batch
    pub count: u32,
}

impl BatchHeader {
    /// Decode the header from the front of a batch payload
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        if data.len() < BATCH_HEADER_SIZE {
            return Err(Error::format(format!(
                "batch header needs {} bytes, got {}",
                BATCH_HEADER_SIZE,
                data.len()
            )));
        }
        let sequence = data.get_u64_le();
        let count = data.get_u32_le();
        Ok(Self { sequence, count })
    }
}

/// Type of write operation in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Put operation with key and value
    Put {
        /// Key to insert
        key: Vec<u8>,
        /// Value to associate with the key
        value: Vec<u8>,
    },
    /// Delete operation with key
    Delete {
        /// Key to delete
        key: Vec<u8>,
    },
}

impl BatchOp {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        match self {
            BatchOp::Put { key, value } => {
                buf.put_u8(ValueType::Value.as_u8());
                put_varint(buf, key.len() as u64);
                buf.put_slice(key);
                put_varint(buf, value.len() as u64);
                buf.put_slice(value);
            }
            BatchOp::Delete { key } => {
                buf.put_u8(ValueType::Deletion.as_u8());
                put_varint(buf, key.len() as u64);
                buf.put_slice(key);
            }
        }
    }
}

/// Read one operation from the front of `buf`.
///
/// Returns `Ok(None)` when the buffer runs out, whether at an operation
/// boundary or part way through one; `buf` is only advanced past complete
/// operations.
pub fn read_op(buf: &mut &[u8]) -> Result<Option<BatchOp>> {
    let Some((&tag, rest)) = buf.split_first() else {
        return Ok(None);
    };
    let value_type = ValueType::from_u8(tag)
        .ok_or_else(|| Error::format(format!("unknown batch operation tag {}", tag)))?;

    let mut cursor = rest;
    let Some(key) = take_slice(&mut cursor) else {
        return Ok(None);
    };
    let op = match value_type {
        ValueType::Value => {
            let Some(value) = take_slice(&mut cursor) else {
                return Ok(None);
            };
            BatchOp::Put { key: key.to_vec(), value: value.to_vec() }
        }
        ValueType::Deletion => BatchOp::Delete { key: key.to_vec() },
    };

    *buf = cursor;
    Ok(Some(op))
}

fn take_slice<'a>(buf: &mut &'a [u8]) -> Option<&'a [u8]> {
    let len = get_length(buf).ok()?;
    if len > buf.len() {
        return None;
    }
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Some(head)
}

/// A decoded operation with its assigned sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalOperation {
    /// The user key
    pub user_key: Vec<u8>,
    /// Put or delete
    pub value_type: ValueType,
    /// Sequence number assigned from the batch
    pub sequence: u64,
    /// Value bytes; empty for deletions
    pub value: Vec<u8>,
}

impl WalOperation {
    /// Convert into a record keyed by an internal key
    pub fn into_record(self) -> Record {
        Record::new(InternalKey::new(self.user_key, self.sequence, self.value_type), self.value)
    }
}

/// The operations still owed by a batch whose payload may arrive in pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchCursor {
    next_sequence: u64,
    remaining: u32,
}

impl BatchCursor {
    /// Start a cursor for a batch header
    pub fn new(header: BatchHeader) -> Self {
        Self { next_sequence: header.sequence, remaining: header.count }
    }

    /// Operations not yet decoded
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Sequence number the next operation will receive
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Decode operations from `stream` until the batch is complete or the
    /// stream runs out.
    ///
    /// Running out of bytes is not an error. Decoded operations are pushed
    /// onto `out` even if a later operation fails. An operation whose
    /// sequence number would exceed [`MAX_SEQUENCE`] ends the batch with a
    /// format error.
    pub fn consume(&mut self, mut stream: &[u8], out: &mut Vec<WalOperation>) -> Result<()> {
        while self.remaining > 0 {
            let Some(op) = read_op(&mut stream)? else {
                break;
            };
            let sequence = self.next_sequence;
            if sequence > MAX_SEQUENCE {
                return Err(Error::format(format!(
                    "batch sequence {} exceeds {}",
                    sequence, MAX_SEQUENCE
                )));
            }
            self.next_sequence += 1;
            self.remaining -= 1;

            out.push(match op {
                BatchOp::Put { key, value } => WalOperation {
                    user_key: key,
                    value_type: ValueType::Value,
                    sequence,
                    value,
                },
                BatchOp::Delete { key } => WalOperation {
                    user_key: key,
                    value_type: ValueType::Deletion,
                    sequence,
                    value: Vec::new(),
                },
            });
        }
        Ok(())
    }
}

/// A batch of operations sharing one sequence base.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalBatch {
    /// Sequence number of the first operation
    pub sequence_base: u64,
    /// Operations in batch order
    pub operations: Vec<BatchOp>,
}

impl WalBatch {
    /// Creates a new empty batch.
    pub fn new(sequence_base: u64) -> Self {
        Self { sequence_base, operations: Vec::new() }
    }

    /// Adds a Put operation to the batch.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.operations.push(BatchOp::Put { key: key.to_vec(), value: value.to_vec() });
    }

    /// Adds a Delete operation to the batch.
    pub fn delete(&mut self, key: &[u8]) {
        self.operations.push(BatchOp::Delete { key: key.to_vec() });
    }

    /// Number of operations in the batch
    pub fn operation_count(&self) -> u32 {
        self.operations.len() as u32
    }

    /// Encode the batch payload
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.put_u64_le(self.sequence_base);
        buf.put_u32_le(self.operation_count());
        for op in &self.operations {
            op.encode_to(&mut buf);
        }
        buf
    }

    /// Decode a whole batch payload into sequenced operations.
    ///
    /// A payload that ends before `count` operations keeps the operations
    /// before the cut.
    pub fn decode(payload: &[u8]) -> Partial<WalOperation> {
        let header = match BatchHeader::decode(payload) {
            Ok(header) => header,
            Err(e) => return Partial::truncated(Vec::new(), e),
        };
        let mut operations = Vec::new();
        let mut cursor = BatchCursor::new(header);
        match cursor.consume(&payload[BATCH_HEADER_SIZE..], &mut operations) {
            Ok(()) => Partial::complete(operations),
            Err(e) => Partial::truncated(operations, e),
        }
    }
}
