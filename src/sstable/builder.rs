//! Table builder implementation.
//!
//! Produces table file bytes in memory from a sequence of records. Used to
//! build fixtures for the reader; nothing here touches the filesystem.

use crate::config::CompressionType;
use crate::internal_key::{join, ValueType};
use crate::sstable::block::BlockBuilder;
use crate::sstable::compression::compress;
use crate::sstable::footer::{BlockHandle, Footer};
use crate::sstable::index::{IndexBlockBuilder, IndexEntry};
use crate::sstable::DEFAULT_BLOCK_SIZE;

/// Restart interval LevelDB uses for data blocks.
const DEFAULT_RESTART_INTERVAL: usize = 16;

/// TableBuilder builds a table file image.
///
/// Usage:
/// ```
/// use leveldump::internal_key::ValueType;
/// use leveldump::sstable::TableBuilder;
///
/// let mut builder = TableBuilder::new();
/// builder.add(b"key1", 1, ValueType::Value, b"\x01value1");
/// builder.add(b"key2", 2, ValueType::Deletion, b"");
/// let bytes = builder.finish();
/// assert!(bytes.ends_with(&[0x57, 0xFB, 0x80, 0x8B, 0x24, 0x75, 0x47, 0xDB]));
/// ```
pub struct TableBuilder {
    buffer: Vec<u8>,
    data_block_builder: BlockBuilder,
    index_block_builder: IndexBlockBuilder,
    block_size: usize,
    restart_interval: usize,
    compression: CompressionType,
    num_entries: u64,
}

impl TableBuilder {
    /// Create a new TableBuilder with uncompressed 4KB blocks
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            data_block_builder: BlockBuilder::new(DEFAULT_RESTART_INTERVAL),
            index_block_builder: IndexBlockBuilder::new(),
            block_size: DEFAULT_BLOCK_SIZE,
            restart_interval: DEFAULT_RESTART_INTERVAL,
            compression: CompressionType::None,
            num_entries: 0,
        }
    }

    /// Set the target data block size
    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Set the restart interval of data blocks
    pub fn restart_interval(mut self, interval: usize) -> Self {
        self.restart_interval = interval;
        self.data_block_builder = BlockBuilder::new(interval);
        self
    }

    /// Set the compression type.
    ///
    /// Blocks fall back to no compression when the codec is compiled out.
    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Add a record with the given user key, sequence and type.
    ///
    /// Records are stored in the order added.
    pub fn add(&mut self, user_key: &[u8], sequence: u64, value_type: ValueType, value: &[u8]) {
        let key = join(user_key, sequence, value_type);
        self.add_internal(&key, value);
    }

    /// Add an already encoded internal key
    pub fn add_internal(&mut self, key: &[u8], value: &[u8]) {
        self.data_block_builder.add(key, value);
        self.num_entries += 1;

        if self.data_block_builder.current_size() >= self.block_size {
            self.flush_data_block();
        }
    }

    /// Close the current data block and add an index entry pointing at `handle`
    pub fn add_raw_index_entry(&mut self, key: &[u8], handle: BlockHandle) {
        self.flush_data_block();
        self.index_block_builder.add_entry(&IndexEntry::new(key.to_vec(), handle));
    }

    /// Number of records added so far
    pub fn num_entries(&self) -> u64 {
        self.num_entries
    }

    /// Write the current data block and index it under its last key
    fn flush_data_block(&mut self) {
        if self.data_block_builder.is_empty() {
            return;
        }

        let fresh = BlockBuilder::new(self.restart_interval);
        let old_builder = std::mem::replace(&mut self.data_block_builder, fresh);
        let last_key = old_builder.last_key().to_vec();
        let handle = self.write_block(&old_builder.finish(), self.compression);
        self.index_block_builder.add_entry(&IndexEntry::new(last_key, handle));
    }

    /// Append a block with its trailer and return its handle
    fn write_block(&mut self, block: &[u8], compression: CompressionType) -> BlockHandle {
        let (payload, tag) = match compress(compression, block) {
            Ok(payload) => (payload, compression as u8),
            Err(_) => (block.to_vec(), CompressionType::None as u8),
        };

        let handle = BlockHandle::new(self.buffer.len() as u64, payload.len() as u64);
        self.buffer.extend_from_slice(&payload);
        self.buffer.push(tag);
        // Checksum is not computed; readers never verify it.
        self.buffer.extend_from_slice(&[0u8; 4]);
        handle
    }

    /// Finish the table and return the file image
    pub fn finish(mut self) -> Vec<u8> {
        self.flush_data_block();

        let meta_index = BlockBuilder::new(1).finish();
        let meta_index_handle = self.write_block(&meta_index, CompressionType::None);

        let index_builder = std::mem::take(&mut self.index_block_builder);
        let index_handle = self.write_block(&index_builder.finish(), CompressionType::None);

        self.buffer.extend_from_slice(&Footer::new(meta_index_handle, index_handle).encode());
        self.buffer
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}
