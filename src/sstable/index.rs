//! Index block implementation for table files.
//!
//! The index block maps separator keys to data blocks. Separator keys are
//! internal keys, but shortened separators carry the reserved sentinel
//! sequence, so index entries are walked as raw entries rather than records.

use crate::error::Partial;
use crate::sstable::block::{Block, BlockBuilder};
use crate::sstable::footer::BlockHandle;
use bytes::Bytes;

/// IndexEntry represents a single entry in the index block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// A key at or after the last key in the data block
    pub key: Vec<u8>,
    /// Handle to the data block
    pub handle: BlockHandle,
}

impl IndexEntry {
    /// Create a new IndexEntry
    pub fn new(key: Vec<u8>, handle: BlockHandle) -> Self {
        Self { key, handle }
    }
}

/// IndexBlock lists the data blocks of a table.
#[derive(Debug)]
pub struct IndexBlock {
    block: Block,
}

impl IndexBlock {
    /// Wrap a decoded block as an index block
    pub fn new(block: Block) -> Self {
        Self { block }
    }

    /// Decode every entry and its block handle.
    ///
    /// Stops at the first entry that cannot be decoded, keeping the entries
    /// before it.
    pub fn entries(&self) -> Partial<IndexEntry> {
        let raw = self.block.entries();
        let mut entries = Vec::with_capacity(raw.items.len());
        for entry in raw.items {
            match BlockHandle::decode(&entry.value) {
                Ok(handle) => entries.push(IndexEntry::new(entry.key, handle)),
                Err(e) => return Partial::truncated(entries, e),
            }
        }
        Partial { items: entries, error: raw.error }
    }
}

/// IndexBlockBuilder builds an index block.
pub struct IndexBlockBuilder {
    builder: BlockBuilder,
}

impl IndexBlockBuilder {
    /// Create a new IndexBlockBuilder
    pub fn new() -> Self {
        Self { builder: BlockBuilder::new(1) }
    }

    /// Add an index entry
    pub fn add_entry(&mut self, entry: &IndexEntry) {
        self.builder.add(&entry.key, &entry.handle.encode());
    }

    /// Finish building and return the block data
    pub fn finish(self) -> Bytes {
        self.builder.finish()
    }

    /// Check if the builder is empty
    pub fn is_empty(&self) -> bool {
        self.builder.is_empty()
    }
}

impl Default for IndexBlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}
