//! Block format implementation for table files.
//!
//! A block contains multiple key-value entries and uses restart points
//! for prefix compression.

use crate::coding::{decode_varint_at, put_varint};
use crate::error::{Error, Partial, Result};
use crate::internal_key::{InternalKey, Record};
use bytes::{BufMut, Bytes, BytesMut};

/// Block stores key-value pairs with prefix compression.
///
/// Format:
/// ```text
/// [Entry 1]
/// [Entry 2]
/// ...
/// [Entry N]
/// [Restart Point 1: u32]
/// ...
/// [Restart Point M: u32]
/// [Num Restarts: u32]
/// ```
///
/// Each entry format:
/// ```text
/// [shared_key_len: varint]     // Length of shared prefix with previous key
/// [unshared_key_len: varint]   // Length of unshared key suffix
/// [value_len: varint]          // Length of value
/// [unshared_key: bytes]        // Key suffix
/// [value: bytes]               // Value data
/// ```
#[derive(Debug, Clone)]
pub struct Block {
    data: Bytes,
    restart_offset: usize,
    num_restarts: u32,
}

impl Block {
    /// Create a new Block from decompressed data
    ///
    /// Fails with `MalformedBlock` when the restart trailer cannot be located.
    pub fn new(data: Bytes) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::malformed_block(format!(
                "block of {} bytes has no restart count",
                data.len()
            )));
        }

        let mut count = [0u8; 4];
        count.copy_from_slice(&data[data.len() - 4..]);
        let num_restarts = u32::from_le_bytes(count);

        let restart_offset = (num_restarts as usize)
            .checked_mul(4)
            .and_then(|array| (data.len() - 4).checked_sub(array))
            .ok_or_else(|| {
                Error::malformed_block(format!(
                    "{} restart points do not fit in a {} byte block",
                    num_restarts,
                    data.len()
                ))
            })?;

        Ok(Self { data, restart_offset, num_restarts })
    }

    /// Get the number of restart points
    pub fn num_restarts(&self) -> u32 {
        self.num_restarts
    }

    /// Get a restart point by index
    pub fn restart_point(&self, index: u32) -> Option<u32> {
        if index >= self.num_restarts {
            return None;
        }
        let offset = self.restart_offset + (index as usize * 4);
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.data[offset..offset + 4]);
        Some(u32::from_le_bytes(buf))
    }

    /// Create an iterator over the raw entries of the block
    pub fn iter(&self) -> BlockIter<'_> {
        BlockIter::new(self)
    }

    /// Decode every raw entry, stopping at the first malformed one.
    ///
    /// Keys are returned as stored, without interpreting an internal key
    /// trailer. Used for index and metaindex blocks.
    pub fn entries(&self) -> Partial<BlockEntry> {
        let mut entries = Vec::new();
        for entry in self.iter() {
            match entry {
                Ok(entry) => entries.push(entry),
                Err(e) => return Partial::truncated(entries, e),
            }
        }
        Partial::complete(entries)
    }

    /// Decode the block as a sequence of records keyed by internal keys.
    ///
    /// Decoding stops at the explicit terminator entry, at the end of the
    /// entry region, or at a key carrying the reserved sentinel sequence. The
    /// sentinel entry itself is not returned. Any decode error ends the pass
    /// and the records decoded so far are kept.
    pub fn records(&self) -> Partial<Record> {
        let mut records = Vec::new();
        for entry in self.iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return Partial::truncated(records, e),
            };
            let key = match InternalKey::split(&entry.key) {
                Ok(key) => key,
                Err(e) => return Partial::truncated(records, e),
            };
            if key.is_sentinel() {
                break;
            }
            records.push(Record::new(key, entry.value));
        }
        Partial::complete(records)
    }
}

/// Decodes a decompressed block payload into records.
///
/// A payload whose restart trailer is unusable yields no records and a
/// `MalformedBlock` error.
pub fn decode_block(payload: Bytes) -> Partial<Record> {
    match Block::new(payload) {
        Ok(block) => block.records(),
        Err(e) => Partial::truncated(Vec::new(), e),
    }
}

/// A raw block entry with its fully reconstructed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEntry {
    /// The full key (shared prefix plus stored suffix)
    pub key: Vec<u8>,
    /// The value bytes
    pub value: Vec<u8>,
}

/// Iterator over the raw entries in a block
pub struct BlockIter<'a> {
    block: &'a Block,
    current: usize,
    key: Vec<u8>,
    done: bool,
}

impl<'a> BlockIter<'a> {
    fn new(block: &'a Block) -> Self {
        Self { block, current: 0, key: Vec::new(), done: false }
    }

    /// Parse the entry at the current offset.
    ///
    /// Returns `Ok(None)` at the end of the entry region or at an entry with
    /// both an empty key suffix and an empty value.
    fn parse_next_entry(&mut self) -> Result<Option<BlockEntry>> {
        let block = self.block;
        let limit = block.restart_offset;
        if self.current >= limit {
            return Ok(None);
        }

        let data = &block.data[..limit];
        let (shared, pos) = decode_varint_at(data, self.current)?;
        let (unshared, pos) = decode_varint_at(data, pos)?;
        let (value_len, pos) = decode_varint_at(data, pos)?;

        if unshared == 0 && value_len == 0 {
            return Ok(None);
        }

        let shared = shared as usize;
        if shared > self.key.len() {
            return Err(Error::malformed_block(format!(
                "entry at {} shares {} bytes with a {} byte key",
                self.current,
                shared,
                self.key.len()
            )));
        }

        let key_end = pos
            .checked_add(unshared as usize)
            .filter(|&end| end <= limit)
            .ok_or_else(|| {
                Error::malformed_block(format!("key of entry at {} is truncated", self.current))
            })?;
        let value_end = key_end
            .checked_add(value_len as usize)
            .filter(|&end| end <= limit)
            .ok_or_else(|| {
                Error::malformed_block(format!("value of entry at {} is truncated", self.current))
            })?;

        // Reconstruct key
        self.key.truncate(shared);
        self.key.extend_from_slice(&data[pos..key_end]);
        self.current = value_end;

        Ok(Some(BlockEntry { key: self.key.clone(), value: data[key_end..value_end].to_vec() }))
    }
}

impl Iterator for BlockIter<'_> {
    type Item = Result<BlockEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.parse_next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// BlockBuilder builds a block with prefix compression.
///
/// Keys are written in the order they are added.
pub struct BlockBuilder {
    buffer: BytesMut,
    restarts: Vec<u32>,
    counter: usize,
    entries: usize,
    last_key: Vec<u8>,
    block_restart_interval: usize,
}

impl BlockBuilder {
    /// Create a new BlockBuilder
    pub fn new(block_restart_interval: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            restarts: vec![0], // First restart point at offset 0
            counter: 0,
            entries: 0,
            last_key: Vec::new(),
            block_restart_interval: block_restart_interval.max(1),
        }
    }

    /// Add a key-value pair to the block
    pub fn add(&mut self, key: &[u8], value: &[u8]) {
        let mut shared = 0;

        // Add a restart point if needed
        if self.counter >= self.block_restart_interval {
            self.restarts.push(self.buffer.len() as u32);
            self.counter = 0;
        } else {
            shared = shared_prefix_len(&self.last_key, key);
        }

        let unshared = key.len() - shared;

        // Write entry: shared | unshared | value_len | key_suffix | value
        put_varint(&mut self.buffer, shared as u64);
        put_varint(&mut self.buffer, unshared as u64);
        put_varint(&mut self.buffer, value.len() as u64);
        self.buffer.put_slice(&key[shared..]);
        self.buffer.put_slice(value);

        // Update state
        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        self.counter += 1;
        self.entries += 1;
    }

    /// Finish building and return the block data
    pub fn finish(mut self) -> Bytes {
        for restart in &self.restarts {
            self.buffer.put_u32_le(*restart);
        }
        self.buffer.put_u32_le(self.restarts.len() as u32);
        self.buffer.freeze()
    }

    /// Get the size the block would have if finished now
    pub fn current_size(&self) -> usize {
        self.buffer.len() + self.restarts.len() * 4 + 4
    }

    /// Check if the block is empty
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// The last key added
    pub fn last_key(&self) -> &[u8] {
        &self.last_key
    }
}

fn shared_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
