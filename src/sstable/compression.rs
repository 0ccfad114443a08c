//! Block compression codec.

use crate::config::CompressionType;
use crate::error::{Error, Result};

/// Decompresses a block payload according to its trailer tag.
///
/// Tag 0 returns the payload unchanged; tag 1 is Snappy.
pub fn decompress(tag: u8, data: &[u8]) -> Result<Vec<u8>> {
    let compression = CompressionType::from_u8(tag)
        .ok_or_else(|| Error::Decompression(format!("unknown compression tag {}", tag)))?;

    match compression {
        CompressionType::None => Ok(data.to_vec()),
        #[cfg(feature = "snappy")]
        CompressionType::Snappy => snap::raw::Decoder::new()
            .decompress_vec(data)
            .map_err(|e| Error::Decompression(format!("snappy: {}", e))),
        #[cfg(not(feature = "snappy"))]
        CompressionType::Snappy => {
            Err(Error::Decompression("snappy support not enabled".to_string()))
        }
    }
}

/// Compresses a block payload, returning the bytes to store.
pub fn compress(compression: CompressionType, data: &[u8]) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),
        #[cfg(feature = "snappy")]
        CompressionType::Snappy => snap::raw::Encoder::new()
            .compress_vec(data)
            .map_err(|e| Error::Decompression(format!("snappy: {}", e))),
        #[cfg(not(feature = "snappy"))]
        CompressionType::Snappy => {
            Err(Error::Decompression("snappy support not enabled".to_string()))
        }
    }
}
