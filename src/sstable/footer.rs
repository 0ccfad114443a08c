//! Table footer implementation.
//!
//! The footer is a fixed-size (48 bytes) structure at the end of a table file
//! that contains pointers to the index block and meta index block.

use crate::coding::{get_varint, put_varint};
use crate::error::{Error, Result};
use crate::sstable::{BLOCK_TRAILER_SIZE, FOOTER_SIZE, MAGIC_NUMBER};
use std::ops::Range;

/// Bytes of the footer available to the two handles.
const HANDLES_SIZE: usize = FOOTER_SIZE - 8;

/// BlockHandle represents a pointer to a block in the table file.
///
/// It contains the offset and size of the block, encoded as two varints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    /// Offset of the block in the file
    pub offset: u64,
    /// Size of the block in bytes, excluding its trailer
    pub size: u64,
}

impl BlockHandle {
    /// Create a new BlockHandle
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Append the varint encoding of this handle to `buf`
    pub fn encode_to(&self, buf: &mut Vec<u8>) {
        put_varint(buf, self.offset);
        put_varint(buf, self.size);
    }

    /// Encode the BlockHandle to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(20);
        self.encode_to(&mut buf);
        buf
    }

    /// Decode a BlockHandle from the front of `buf`, advancing it
    pub fn decode_from(buf: &mut &[u8]) -> Result<Self> {
        let offset = get_varint(buf)?;
        let size = get_varint(buf)?;
        Ok(Self { offset, size })
    }

    /// Decode a BlockHandle from bytes, ignoring anything after it
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        Self::decode_from(&mut data)
    }

    /// Get the end offset of this block
    pub fn end_offset(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }

    /// Byte range of the block payload inside a file of `file_len` bytes.
    ///
    /// The block and its trailer must both lie inside the file.
    pub fn payload_range(&self, file_len: usize) -> Result<Range<usize>> {
        let start = usize::try_from(self.offset).ok();
        let end = usize::try_from(self.size)
            .ok()
            .zip(start)
            .and_then(|(size, start)| start.checked_add(size));

        match (start, end) {
            (Some(start), Some(end))
                if end.checked_add(BLOCK_TRAILER_SIZE).is_some_and(|t| t <= file_len) =>
            {
                Ok(start..end)
            }
            _ => Err(Error::format(format!(
                "block handle {}+{} lies outside a {} byte file",
                self.offset, self.size, file_len
            ))),
        }
    }
}

/// Footer is the last 48 bytes of a table file.
///
/// Format:
/// ```text
/// [meta_index_handle: varint offset, varint size]
/// [index_handle: varint offset, varint size]
/// [padding up to 40 bytes]
/// [magic: 8 bytes]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    /// Handle to the meta index block
    pub meta_index_handle: BlockHandle,
    /// Handle to the index block
    pub index_handle: BlockHandle,
}

impl Footer {
    /// Create a new Footer
    pub fn new(meta_index_handle: BlockHandle, index_handle: BlockHandle) -> Self {
        Self { meta_index_handle, index_handle }
    }

    /// Encode the footer to bytes (48 bytes)
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FOOTER_SIZE);
        self.meta_index_handle.encode_to(&mut buf);
        self.index_handle.encode_to(&mut buf);
        buf.resize(HANDLES_SIZE, 0);
        buf.extend_from_slice(&MAGIC_NUMBER.to_le_bytes());
        debug_assert_eq!(buf.len(), FOOTER_SIZE);
        buf
    }

    /// Decode a footer from the last 48 bytes of a table file
    pub fn decode(data: &[u8]) -> Result<Self> {
        if !has_magic(data) {
            return Err(Error::MissingFooter);
        }
        if data.len() != FOOTER_SIZE {
            return Err(Error::format(format!(
                "footer size mismatch: expected {}, got {}",
                FOOTER_SIZE,
                data.len()
            )));
        }

        let mut handles = &data[..HANDLES_SIZE];
        let meta_index_handle = BlockHandle::decode_from(&mut handles)?;
        let index_handle = BlockHandle::decode_from(&mut handles)?;

        Ok(Self { meta_index_handle, index_handle })
    }

    /// Locate and decode the footer at the end of a whole table file
    pub fn from_file_bytes(file: &[u8]) -> Result<Self> {
        if !has_magic(file) {
            return Err(Error::MissingFooter);
        }
        if file.len() < FOOTER_SIZE {
            return Err(Error::format(format!(
                "file of {} bytes is shorter than a footer",
                file.len()
            )));
        }
        Self::decode(&file[file.len() - FOOTER_SIZE..])
    }
}

/// Returns true if `data` ends with the table magic number.
pub fn has_magic(data: &[u8]) -> bool {
    data.ends_with(&MAGIC_NUMBER.to_le_bytes())
}
