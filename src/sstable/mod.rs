//! Table file (`.ldb` / `.sst`) decoding.
//!
//! A table is an immutable, sorted file of internal keys and values.
//!
//! ## File Format
//!
//! ```text
//! [Data Block 1][trailer]
//! [Data Block 2][trailer]
//! ...
//! [Data Block N][trailer]
//! [Meta Block][trailer]         // filter blocks, not expanded
//! [Meta Index Block][trailer]   // names the meta blocks
//! [Index Block][trailer]        // one entry per data block
//! [Footer: 48B]                 // points to the metaindex and index blocks
//! ```
//!
//! Every block is followed by a 5-byte trailer: a compression tag (0 = none,
//! 1 = snappy) and a 4-byte checksum that is read but never verified.
//!
//! ## Index Format
//!
//! The index block contains entries that map keys to data blocks:
//! - Key: a separator at or after the largest key in the block
//! - Value: varint offset and varint size of the data block

pub mod block;
pub mod builder;
pub mod compression;
pub mod footer;
pub mod index;
pub mod reader;

pub use block::{decode_block, Block, BlockBuilder, BlockEntry, BlockIter};
pub use builder::TableBuilder;
pub use footer::{BlockHandle, Footer};
pub use index::{IndexBlock, IndexBlockBuilder, IndexEntry};
pub use reader::{read_table, BlockError, BlockKind, TableContents, TableReader};

// Re-export CompressionType from config
pub use crate::config::CompressionType;

/// Default block size (4KB)
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Footer size in bytes (fixed)
pub const FOOTER_SIZE: usize = 48;

/// Compression tag plus checksum after every block
pub const BLOCK_TRAILER_SIZE: usize = 5;

/// Magic number closing every table file, stored little-endian
pub const MAGIC_NUMBER: u64 = 0xdb4775248b80fb57;
