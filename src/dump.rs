//! Directory dump: decode every log segment and table, then merge.
//!
//! ```rust,no_run
//! use leveldump::{Dumper, Options};
//!
//! # fn main() -> Result<(), leveldump::Error> {
//! let report = Dumper::new(Options::default()).dump_dir("./chrome/Local Storage/leveldb")?;
//! for (key, value) in report.snapshot.to_text_map() {
//!     println!("{} = {}", key, value);
//! }
//! eprintln!("{} files skipped", report.skipped());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam::channel;
use log::{info, warn};

use crate::config::{Options, WalFraming};
use crate::discovery::{discover, FileKind};
use crate::error::{Error, Result};
use crate::internal_key::Record;
use crate::snapshot::{KeySnapshot, LiveSnapshot};
use crate::sstable::TableReader;
use crate::wal::LogReader;

/// How far decoding of one file got.
#[derive(Debug)]
pub enum FileOutcome {
    /// Every block or record decoded
    Complete {
        /// Records contributed to the merge
        records: usize,
    },
    /// Some blocks or records failed; the rest still contributed
    Partial {
        /// Records contributed to the merge
        records: usize,
        /// Contained failures, rendered with their location
        errors: Vec<String>,
    },
    /// The file could not be read at all and contributed nothing
    Skipped(Error),
}

impl FileOutcome {
    /// Number of records the file contributed
    pub fn records(&self) -> usize {
        match self {
            FileOutcome::Complete { records } | FileOutcome::Partial { records, .. } => *records,
            FileOutcome::Skipped(_) => 0,
        }
    }

    fn from_parts(records: usize, errors: Vec<String>) -> Self {
        if errors.is_empty() {
            FileOutcome::Complete { records }
        } else {
            FileOutcome::Partial { records, errors }
        }
    }
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutcome::Complete { records } => write!(f, "{} records", records),
            FileOutcome::Partial { records, errors } => {
                write!(f, "{} records, {} errors", records, errors.len())
            }
            FileOutcome::Skipped(e) => write!(f, "skipped: {}", e),
        }
    }
}

/// The result of decoding a single file.
#[derive(Debug)]
pub struct FileReport {
    /// File that was decoded
    pub path: PathBuf,
    /// Whether it was read as a log segment or a table
    pub kind: FileKind,
    /// What came out of it
    pub outcome: FileOutcome,
}

/// The merged live view plus a report for every file that fed it.
#[derive(Debug, Default)]
pub struct DumpReport {
    /// Live keys after merging
    pub snapshot: LiveSnapshot,
    /// One report per file, in fold order
    pub files: Vec<FileReport>,
}

impl DumpReport {
    /// Total records folded into the snapshot
    pub fn records(&self) -> usize {
        self.files.iter().map(|f| f.outcome.records()).sum()
    }

    /// Files that decoded without errors
    pub fn complete(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Complete { .. }))
    }

    /// Files that decoded with contained errors
    pub fn partial(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Partial { .. }))
    }

    /// Files that contributed nothing
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }
}

struct Decoded {
    records: Vec<Record>,
    outcome: FileOutcome,
}

/// Decodes and merges the files of a LevelDB directory.
#[derive(Debug, Clone, Default)]
pub struct Dumper {
    options: Options,
}

impl Dumper {
    /// Create a dumper with the given options
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Discover files under `dir` and merge them.
    ///
    /// Only invalid options or an unlistable `dir` are errors; per-file
    /// failures are recorded in the report.
    pub fn dump_dir<P: AsRef<Path>>(&self, dir: P) -> Result<DumpReport> {
        self.options.validate()?;
        let dir = dir.as_ref();
        let found = discover(dir, &self.options)?;
        info!(
            "Dumping {}: {} log segments, {} tables",
            dir.display(),
            found.logs.len(),
            found.tables.len()
        );
        Ok(self.merge(&found.logs, &found.tables))
    }

    /// Decode the given files and fold them, logs first, each list in the
    /// order given.
    pub fn merge(&self, log_files: &[PathBuf], table_files: &[PathBuf]) -> DumpReport {
        let jobs: Vec<(PathBuf, FileKind)> = log_files
            .iter()
            .map(|p| (p.clone(), FileKind::Log))
            .chain(table_files.iter().map(|p| (p.clone(), FileKind::Table)))
            .collect();

        let decoded = if self.options.parallel && jobs.len() > 1 {
            decode_parallel(&jobs, self.options.wal_framing)
        } else {
            jobs.iter()
                .map(|(path, kind)| decode_file(path, *kind, self.options.wal_framing))
                .collect()
        };

        let mut snapshot = KeySnapshot::new();
        let mut files = Vec::with_capacity(jobs.len());
        for ((path, kind), Decoded { records, outcome }) in jobs.into_iter().zip(decoded) {
            snapshot.extend(records);
            files.push(FileReport { path, kind, outcome });
        }

        let report = DumpReport { snapshot: snapshot.into_live(), files };
        info!(
            "Merged {} records from {} files into {} live keys",
            report.records(),
            report.files.len(),
            report.snapshot.len()
        );
        report
    }
}

fn decode_file(path: &Path, kind: FileKind, framing: WalFraming) -> Decoded {
    let result = match kind {
        FileKind::Log => decode_log(path, framing),
        FileKind::Table => decode_table(path),
    };

    match result {
        Ok(decoded) => {
            match &decoded.outcome {
                FileOutcome::Partial { errors, .. } => {
                    warn!("{} {} decoded partially ({} errors)", kind, path.display(), errors.len())
                }
                _ => info!("{} {}: {}", kind, path.display(), decoded.outcome),
            }
            decoded
        }
        Err(e) => {
            warn!("Skipping {} {}: {}", kind, path.display(), e);
            Decoded { records: Vec::new(), outcome: FileOutcome::Skipped(e) }
        }
    }
}

fn decode_log(path: &Path, framing: WalFraming) -> Result<Decoded> {
    let contents = LogReader::open(path, framing)?.read();
    let records: Vec<Record> = contents.operations.into_iter().map(|op| op.into_record()).collect();
    let errors = contents.errors.iter().map(ToString::to_string).collect();
    Ok(Decoded { outcome: FileOutcome::from_parts(records.len(), errors), records })
}

fn decode_table(path: &Path) -> Result<Decoded> {
    let contents = TableReader::open(path)?.read();
    let errors = contents.errors.iter().map(ToString::to_string).collect();
    let outcome = FileOutcome::from_parts(contents.records.len(), errors);
    Ok(Decoded { records: contents.records, outcome })
}

/// Decode files on a pool of worker threads, returning results in job order.
fn decode_parallel(jobs: &[(PathBuf, FileKind)], framing: WalFraming) -> Vec<Decoded> {
    let workers = thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1).min(jobs.len());

    let (job_tx, job_rx) = channel::unbounded::<usize>();
    let (done_tx, done_rx) = channel::unbounded::<(usize, Decoded)>();
    for index in 0..jobs.len() {
        // The receiver is alive, so sending cannot fail.
        let _ = job_tx.send(index);
    }
    drop(job_tx);

    let scoped = crossbeam::scope(|s| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let done_tx = done_tx.clone();
            s.spawn(move |_| {
                for index in job_rx.iter() {
                    let (path, kind) = &jobs[index];
                    if done_tx.send((index, decode_file(path, *kind, framing))).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(done_tx);
    if scoped.is_err() {
        warn!("A decoder thread panicked; its files are reported as skipped");
    }

    let mut slots: Vec<Option<Decoded>> = jobs.iter().map(|_| None).collect();
    for (index, decoded) in done_rx.iter() {
        slots[index] = Some(decoded);
    }
    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| Decoded {
                records: Vec::new(),
                outcome: FileOutcome::Skipped(Error::format("decoder thread panicked")),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal_key::ValueType;
    use crate::snapshot::LiveValue;
    use crate::sstable::TableBuilder;
    use crate::wal::{LogWriter, WalBatch};
    use std::fs;
    use tempfile::TempDir;

    fn write_log(dir: &Path, name: &str, batches: &[WalBatch]) -> PathBuf {
        let mut writer = LogWriter::new();
        for batch in batches {
            writer.add_batch(batch);
        }
        let path = dir.join(name);
        fs::write(&path, writer.finish()).unwrap();
        path
    }

    fn write_table(dir: &Path, name: &str, entries: &[(&[u8], u64, ValueType, &[u8])]) -> PathBuf {
        let mut builder = TableBuilder::new();
        for (key, seq, vt, value) in entries {
            builder.add(key, *seq, *vt, value);
        }
        let path = dir.join(name);
        fs::write(&path, builder.finish()).unwrap();
        path
    }

    #[test]
    fn test_single_log_batch() {
        let tmp_dir = TempDir::new().unwrap();
        let mut batch = WalBatch::new(100);
        batch.put(b"a", b"\x01v1");
        batch.delete(b"b");
        write_log(tmp_dir.path(), "000003.log", &[batch]);

        let report = Dumper::default().dump_dir(tmp_dir.path()).unwrap();
        assert_eq!(report.snapshot.len(), 1);
        assert_eq!(report.snapshot.get(b"a"), Some(&LiveValue::Text("v1".to_string())));
        assert!(!report.snapshot.contains_key(b"b"));
        assert_eq!(report.records(), 2);
        assert_eq!(report.complete(), 1);
    }

    #[test]
    fn test_log_tombstone_hides_table_value() {
        let tmp_dir = TempDir::new().unwrap();
        let table = write_table(
            tmp_dir.path(),
            "000005.ldb",
            &[(b"k", 5, ValueType::Value, b"\x01old"), (b"z", 2, ValueType::Value, b"\x01zz")],
        );
        let mut batch = WalBatch::new(9);
        batch.delete(b"k");
        let log = write_log(tmp_dir.path(), "000006.log", &[batch]);

        let report = Dumper::default().merge(&[log], &[table]);
        assert!(!report.snapshot.contains_key(b"k"));
        assert_eq!(report.snapshot.get(b"z"), Some(&LiveValue::Text("zz".to_string())));
    }

    #[test]
    fn test_unreadable_table_is_skipped() {
        let tmp_dir = TempDir::new().unwrap();
        fs::write(tmp_dir.path().join("000007.ldb"), vec![0u8; 100]).unwrap();
        write_table(tmp_dir.path(), "000008.ldb", &[(b"x", 1, ValueType::Value, b"\x01y")]);

        let report = Dumper::default().dump_dir(tmp_dir.path()).unwrap();
        assert_eq!(report.skipped(), 1);
        assert!(matches!(report.files[0].outcome, FileOutcome::Skipped(Error::MissingFooter)));
        assert_eq!(report.snapshot.len(), 1);
    }

    #[test]
    fn test_invalid_options() {
        let tmp_dir = TempDir::new().unwrap();
        let dumper = Dumper::new(Options::default().log_extension(""));
        assert!(matches!(dumper.dump_dir(tmp_dir.path()), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let tmp_dir = TempDir::new().unwrap();
        for i in 0..6u64 {
            let mut batch = WalBatch::new(i * 10 + 1);
            batch.put(b"shared", format!("\x01from-{}", i).as_bytes());
            batch.put(format!("own-{}", i).as_bytes(), b"\x01x");
            write_log(tmp_dir.path(), &format!("{:06}.log", i), &[batch]);
        }
        write_table(tmp_dir.path(), "000010.ldb", &[(b"shared", 3, ValueType::Value, b"\x01table")]);

        let sequential = Dumper::default().dump_dir(tmp_dir.path()).unwrap();
        let parallel = Dumper::new(Options::default().parallel(true)).dump_dir(tmp_dir.path()).unwrap();

        assert_eq!(sequential.snapshot, parallel.snapshot);
        assert_eq!(parallel.snapshot.get(b"shared"), Some(&LiveValue::Text("from-5".to_string())));
        let order: Vec<&PathBuf> = parallel.files.iter().map(|f| &f.path).collect();
        let expected: Vec<&PathBuf> = sequential.files.iter().map(|f| &f.path).collect();
        assert_eq!(order, expected);
    }
}
