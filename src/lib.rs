//! # leveldump - Offline LevelDB Reader
//!
//! leveldump reconstructs the live key-value contents of a LevelDB directory
//! without opening it as a database. It decodes write-ahead log segments and
//! sorted table files directly, then reconciles every record by sequence
//! number so that only the newest version of each key survives.
//!
//! ## Architecture
//!
//! The reader consists of several components:
//!
//! - **Coding**: LEB128 varints used throughout both file formats
//! - **Internal Keys**: user key plus a packed sequence number and type
//! - **SSTable**: footer, index and prefix-compressed data blocks
//! - **WAL**: physical records carrying write batches
//! - **Snapshot**: per-key reconciliation with tombstone semantics
//! - **Dump**: discovery and merging of a whole directory
//!
//! Decoding never stops at the first error. A damaged block or record keeps
//! whatever decoded before the damage, and a file that cannot be read at all
//! is reported and left out of the merge.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use leveldump::snapshot::render_key;
//! use leveldump::{Dumper, Options};
//!
//! # fn main() -> Result<(), leveldump::Error> {
//! let dumper = Dumper::new(Options::default().parallel(true));
//! let report = dumper.dump_dir("./leveldb")?;
//!
//! for (key, value) in report.snapshot.iter() {
//!     println!("{:?} = {}", render_key(key), value);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod coding;
pub mod config;
pub mod discovery;
pub mod dump;
pub mod error;
pub mod internal_key;
pub mod snapshot;
pub mod sstable;
pub mod wal;

// Re-exports
pub use config::{CompressionType, Options, WalFraming};
pub use discovery::{discover, Discovered, FileKind};
pub use dump::{DumpReport, Dumper, FileOutcome, FileReport};
pub use error::{Error, Partial, Result};
pub use internal_key::{InternalKey, Record, ValueType};
pub use snapshot::{fold_records, KeySnapshot, LiveSnapshot, LiveValue};
