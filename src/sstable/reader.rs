//! Table reader implementation.
//!
//! Materializes every record of a table file: the footer locates the index
//! block, each index entry points at a data block, and every data block is
//! decoded in file order.

use crate::error::{Error, Partial, Result};
use crate::internal_key::{Record, ValueType};
use crate::snapshot::KeySnapshot;
use crate::sstable::block::{Block, BlockEntry};
use crate::sstable::compression::decompress;
use crate::sstable::footer::{BlockHandle, Footer};
use crate::sstable::index::{IndexBlock, IndexEntry};
use bytes::Bytes;
use std::fmt;
use std::path::Path;

/// The role of a block inside a table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// The metaindex block named by the footer.
    MetaIndex,
    /// The index block named by the footer.
    Index,
    /// A data block named by an index entry.
    Data,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::MetaIndex => write!(f, "metaindex block"),
            BlockKind::Index => write!(f, "index block"),
            BlockKind::Data => write!(f, "data block"),
        }
    }
}

/// A decode failure contained to a single block.
#[derive(Debug)]
pub struct BlockError {
    /// Which block failed.
    pub kind: BlockKind,
    /// Where the block lives.
    pub handle: BlockHandle,
    /// Why decoding stopped.
    pub error: Error,
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {} (+{}): {}", self.kind, self.handle.offset, self.handle.size, self.error)
    }
}

/// Everything recovered from one table file.
#[derive(Debug, Default)]
pub struct TableContents {
    /// Data block records in file order.
    pub records: Vec<Record>,
    /// Block-level failures; records before each failure are kept.
    pub errors: Vec<BlockError>,
    /// Number of data blocks the index referenced.
    pub data_blocks: usize,
}

impl TableContents {
    /// Fold the records into one entry per user key, highest sequence first.
    pub fn into_snapshot(self) -> KeySnapshot {
        crate::snapshot::fold_records(self.records)
    }
}

/// TableReader provides read access to an in-memory table file.
///
/// Usage:
/// ```no_run
/// use leveldump::sstable::TableReader;
///
/// let reader = TableReader::open("000005.ldb").unwrap();
/// for record in reader.read().records {
///     println!("{:?} @ {}", record.user_key(), record.sequence());
/// }
/// ```
#[derive(Debug)]
pub struct TableReader {
    data: Bytes,
    footer: Footer,
}

impl TableReader {
    /// Read a whole table file into memory and resolve its footer
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(Bytes::from(data))
    }

    /// Resolve the footer of an in-memory table file
    ///
    /// Fails with `MissingFooter` if the file does not end with the table
    /// magic number.
    pub fn from_bytes(data: Bytes) -> Result<Self> {
        let footer = Footer::from_file_bytes(&data)?;
        Ok(Self { data, footer })
    }

    /// Read, decompress and parse the block at `handle`.
    ///
    /// The compression tag is the byte right after the block; the four
    /// checksum bytes after it are not verified.
    pub fn read_block(&self, handle: &BlockHandle) -> Result<Block> {
        let range = handle.payload_range(self.data.len())?;
        let tag = self.data[range.end];
        let payload = decompress(tag, &self.data[range])?;
        Block::new(Bytes::from(payload))
    }

    /// Enumerate the metaindex block without following its handles
    pub fn meta_index_entries(&self) -> Partial<BlockEntry> {
        match self.read_block(&self.footer.meta_index_handle) {
            Ok(block) => block.entries(),
            Err(e) => Partial::truncated(Vec::new(), e),
        }
    }

    /// Decode the index block into data block handles
    pub fn index_entries(&self) -> Partial<IndexEntry> {
        match self.read_block(&self.footer.index_handle) {
            Ok(block) => IndexBlock::new(block).entries(),
            Err(e) => Partial::truncated(Vec::new(), e),
        }
    }

    /// Decode the data block at `handle` into records
    pub fn data_block_records(&self, handle: &BlockHandle) -> Partial<Record> {
        match self.read_block(handle) {
            Ok(block) => block.records(),
            Err(e) => Partial::truncated(Vec::new(), e),
        }
    }

    /// Decode every data block the index references.
    ///
    /// Failures are contained to the block they happen in.
    pub fn read(&self) -> TableContents {
        let mut contents = TableContents::default();

        let meta = self.meta_index_entries();
        for entry in &meta.items {
            log::debug!("metaindex entry {}", String::from_utf8_lossy(&entry.key));
        }
        if let Some(error) = meta.error {
            contents.errors.push(BlockError {
                kind: BlockKind::MetaIndex,
                handle: self.footer.meta_index_handle,
                error,
            });
        }

        let index = self.index_entries();
        if let Some(error) = index.error {
            contents.errors.push(BlockError {
                kind: BlockKind::Index,
                handle: self.footer.index_handle,
                error,
            });
        }

        contents.data_blocks = index.items.len();
        for entry in index.items {
            log::debug!("data block at {} (+{})", entry.handle.offset, entry.handle.size);
            let decoded = self.data_block_records(&entry.handle);
            for record in &decoded.items {
                log::debug!(
                    "  [{}] {} seq={}",
                    if record.value_type() == ValueType::Value { 'O' } else { 'X' },
                    String::from_utf8_lossy(record.user_key()),
                    record.sequence()
                );
            }
            contents.records.extend(decoded.items);
            if let Some(error) = decoded.error {
                log::warn!("data block at {} decoded partially: {}", entry.handle.offset, error);
                contents.errors.push(BlockError { kind: BlockKind::Data, handle: entry.handle, error });
            }
        }

        contents
    }
}

/// Decode a whole table file held in memory.
pub fn read_table(data: Bytes) -> Result<TableContents> {
    Ok(TableReader::from_bytes(data)?.read())
}
