//! Configuration options for leveldump.

use crate::error::{Error, Result};

/// How physical log records are mapped onto write batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalFraming {
    /// Walk records back to back; type 1 or 2 starts a batch and every other
    /// type continues the batch in progress.
    #[default]
    Simple,

    /// Respect 32 KiB log blocks and reassemble Full/First/Middle/Last
    /// fragments into whole batches before decoding them.
    Blocked,
}

/// Options controlling discovery and decoding of a LevelDB directory.
#[derive(Debug, Clone)]
pub struct Options {
    /// File extension of write-ahead log segments.
    /// Default: "log"
    pub log_extension: String,

    /// File extensions of table files.
    /// Default: ["ldb", "sst"]
    pub table_extensions: Vec<String>,

    /// Subdirectory searched when a file kind has no match directly under
    /// the input directory. `None` disables the fallback.
    /// Default: Some("leveldb")
    pub nested_dir: Option<String>,

    /// Physical framing used when reading log segments.
    /// Default: WalFraming::Simple
    pub wal_framing: WalFraming,

    /// Decode files on worker threads before folding them together.
    /// Default: false
    pub parallel: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            log_extension: "log".to_string(),
            table_extensions: vec!["ldb".to_string(), "sst".to_string()],
            nested_dir: Some("leveldb".to_string()),
            wal_framing: WalFraming::Simple,
            parallel: false,
        }
    }
}

impl Options {
    /// Creates a new Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log segment extension.
    pub fn log_extension(mut self, ext: impl Into<String>) -> Self {
        self.log_extension = ext.into();
        self
    }

    /// Sets the table file extensions.
    pub fn table_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table_extensions = exts.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the fallback subdirectory.
    pub fn nested_dir(mut self, dir: Option<String>) -> Self {
        self.nested_dir = dir;
        self
    }

    /// Sets the log framing mode.
    pub fn wal_framing(mut self, framing: WalFraming) -> Self {
        self.wal_framing = framing;
        self
    }

    /// Enables or disables parallel file decoding.
    pub fn parallel(mut self, value: bool) -> Self {
        self.parallel = value;
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.log_extension.is_empty() {
            return Err(Error::invalid_argument("log_extension must not be empty"));
        }
        if self.table_extensions.is_empty() {
            return Err(Error::invalid_argument("table_extensions must not be empty"));
        }
        if self.table_extensions.iter().any(|ext| ext.is_empty()) {
            return Err(Error::invalid_argument("table extensions must not be empty"));
        }
        if self.table_extensions.contains(&self.log_extension) {
            return Err(Error::invalid_argument(
                "log_extension must differ from the table extensions",
            ));
        }
        if matches!(&self.nested_dir, Some(dir) if dir.is_empty()) {
            return Err(Error::invalid_argument("nested_dir must not be empty"));
        }
        Ok(())
    }
}

/// Block compression algorithms found in table files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionType {
    /// No compression.
    None = 0,

    /// Snappy compression.
    Snappy = 1,
}

impl CompressionType {
    /// Convert from the trailer tag byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CompressionType::None),
            1 => Some(CompressionType::Snappy),
            _ => None,
        }
    }
}

impl Default for CompressionType {
    fn default() -> Self {
        #[cfg(feature = "snappy")]
        return CompressionType::Snappy;

        #[cfg(not(feature = "snappy"))]
        CompressionType::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = Options::default();
        assert_eq!(opts.log_extension, "log");
        assert_eq!(opts.table_extensions, vec!["ldb", "sst"]);
        assert_eq!(opts.nested_dir.as_deref(), Some("leveldb"));
        assert_eq!(opts.wal_framing, WalFraming::Simple);
        assert!(!opts.parallel);
    }

    #[test]
    fn test_options_builder() {
        let opts = Options::new()
            .table_extensions(["ldb"])
            .nested_dir(None)
            .wal_framing(WalFraming::Blocked)
            .parallel(true);

        assert_eq!(opts.table_extensions, vec!["ldb"]);
        assert!(opts.nested_dir.is_none());
        assert_eq!(opts.wal_framing, WalFraming::Blocked);
        assert!(opts.parallel);
    }

    #[test]
    fn test_options_validation() {
        let opts = Options::default();
        assert!(opts.validate().is_ok());

        assert!(Options::new().log_extension("").validate().is_err());
        assert!(Options::new().table_extensions(Vec::<String>::new()).validate().is_err());
        assert!(Options::new().table_extensions(["log"]).validate().is_err());
        assert!(Options::new().nested_dir(Some(String::new())).validate().is_err());
    }

    #[test]
    fn test_compression_from_u8() {
        assert_eq!(CompressionType::from_u8(0), Some(CompressionType::None));
        assert_eq!(CompressionType::from_u8(1), Some(CompressionType::Snappy));
        assert_eq!(CompressionType::from_u8(2), None);
    }
}
