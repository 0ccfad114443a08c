//! Write-ahead log segment decoding.
//!
//! A log segment is a sequence of physical records, each carrying a write
//! batch or a fragment of one. Decoding yields every operation with the
//! sequence number its batch assigned to it.
//!
//! ## Architecture
//!
//! - **Record Format**: checksum, length and type in front of each fragment
//! - **Batches**: sequence base and count followed by put/delete operations
//! - **Framing**: `WalFraming::Simple` walks records back to back,
//!   `WalFraming::Blocked` reassembles fragments across 32 KiB blocks
//!
//! ## Usage
//!
//! ```rust
//! use bytes::Bytes;
//! use leveldump::config::WalFraming;
//! use leveldump::wal::{read_log, LogWriter, WalBatch};
//!
//! let mut batch = WalBatch::new(100);
//! batch.put(b"a", b"\x01v1");
//! batch.delete(b"b");
//!
//! let mut writer = LogWriter::new();
//! writer.add_batch(&batch);
//!
//! let contents = read_log(Bytes::from(writer.finish()), WalFraming::Simple);
//! assert_eq!(contents.operations.len(), 2);
//! assert_eq!(contents.operations[1].sequence, 101);
//! ```

pub mod batch;
pub mod reader;
pub mod record;
pub mod writer;

pub use batch::{BatchCursor, BatchHeader, BatchOp, WalBatch, WalOperation};
pub use reader::{read_log, LogContents, LogError, LogReader};
pub use record::{RecordHeader, RecordType};
pub use writer::LogWriter;
