//! Locating log segments and table files in a LevelDB directory.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::Options;
use crate::error::Result;

/// The kind of file a path was discovered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Write-ahead log segment
    Log,
    /// Sorted table file
    Table,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Log => f.write_str("log"),
            FileKind::Table => f.write_str("table"),
        }
    }
}

/// Candidate files found under a directory, each list sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovered {
    /// Log segments
    pub logs: Vec<PathBuf>,
    /// Table files
    pub tables: Vec<PathBuf>,
}

impl Discovered {
    /// Total number of files found
    pub fn len(&self) -> usize {
        self.logs.len() + self.tables.len()
    }

    /// Check if nothing was found
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty() && self.tables.is_empty()
    }
}

/// Find log segments and table files under `dir`.
///
/// Each kind is searched directly under `dir` first. If none is found there
/// and `options.nested_dir` is set, that subdirectory is searched instead.
/// Failing to list `dir` itself is an error; a missing or unreadable nested
/// directory just yields no files.
pub fn discover(dir: &Path, options: &Options) -> Result<Discovered> {
    let top = list_files(dir)?;
    let nested = match &options.nested_dir {
        Some(name) => {
            let path = dir.join(name);
            match list_files(&path) {
                Ok(files) => files,
                Err(e) => {
                    debug!("Nested directory {} not searched: {}", path.display(), e);
                    Vec::new()
                }
            }
        }
        None => Vec::new(),
    };

    let pick = |kind: FileKind| {
        let found = select(&top, kind, options);
        if found.is_empty() {
            select(&nested, kind, options)
        } else {
            found
        }
    };

    let discovered = Discovered { logs: pick(FileKind::Log), tables: pick(FileKind::Table) };
    debug!(
        "Discovered {} log segments and {} tables under {}",
        discovered.logs.len(),
        discovered.tables.len(),
        dir.display()
    );
    Ok(discovered)
}

/// Classify a path by its extension
pub fn classify(path: &Path, options: &Options) -> Option<FileKind> {
    let ext = path.extension()?.to_str()?;
    if ext == options.log_extension {
        Some(FileKind::Log)
    } else if options.table_extensions.iter().any(|t| t == ext) {
        Some(FileKind::Table)
    } else {
        None
    }
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

fn select(files: &[PathBuf], kind: FileKind, options: &Options) -> Vec<PathBuf> {
    let mut selected: Vec<PathBuf> =
        files.iter().filter(|p| classify(p, options) == Some(kind)).cloned().collect();
    selected.sort();
    selected
}
