// Corruption Tests for leveldump
// These tests damage files on disk and verify that decoding degrades per file

use leveldump::internal_key::ValueType;
use leveldump::sstable::{TableBuilder, FOOTER_SIZE};
use leveldump::wal::{LogWriter, WalBatch};
use leveldump::{Dumper, Error, FileOutcome, LiveValue, Options, WalFraming};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn table_bytes(count: u64, block_size: usize) -> Vec<u8> {
    let mut builder = TableBuilder::new().block_size(block_size);
    for i in 0..count {
        let key = format!("key_{:03}", i);
        builder.add(key.as_bytes(), i + 1, ValueType::Value, b"\x01value");
    }
    builder.finish()
}

fn log_bytes(sequence: u64, keys: &[&str]) -> Vec<u8> {
    let mut batch = WalBatch::new(sequence);
    for key in keys {
        batch.put(key.as_bytes(), b"\x01v");
    }
    let mut writer = LogWriter::new();
    writer.add_batch(&batch);
    writer.finish()
}

fn write(dir: &Path, name: &str, data: &[u8]) {
    fs::write(dir.join(name), data).unwrap();
}

/// A table without the magic number is skipped and the rest still merge
#[test]
fn test_missing_footer_is_skipped() {
    env_logger::try_init().ok();
    let dir = TempDir::new().unwrap();

    let mut bad = table_bytes(10, 64);
    let len = bad.len();
    bad[len - 1] ^= 0xff;
    write(dir.path(), "000004.ldb", &bad);
    write(dir.path(), "000005.ldb", &table_bytes(3, 4096));
    write(dir.path(), "000006.log", &log_bytes(500, &["from_log"]));

    let report = Dumper::default().dump_dir(dir.path()).unwrap();

    assert_eq!(report.skipped(), 1);
    let skipped = report.files.iter().find(|f| f.path.ends_with("000004.ldb")).unwrap();
    assert!(matches!(skipped.outcome, FileOutcome::Skipped(Error::MissingFooter)));
    assert_eq!(report.snapshot.len(), 4);
    assert!(report.snapshot.contains_key(b"from_log"));
}

/// A file shorter than a footer is skipped
#[test]
fn test_tiny_table_is_skipped() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "000001.ldb", &[0u8; FOOTER_SIZE - 1]);

    let report = Dumper::default().dump_dir(dir.path()).unwrap();
    assert_eq!(report.skipped(), 1);
    assert!(report.snapshot.is_empty());
}

/// A damaged data block loses only its own records
#[test]
fn test_damaged_data_block_is_partial() {
    let dir = TempDir::new().unwrap();

    let mut data = table_bytes(40, 64);
    // The first entry of the first block claims a shared prefix it cannot have.
    data[0] = 0x05;
    write(dir.path(), "000007.ldb", &data);

    let report = Dumper::default().dump_dir(dir.path()).unwrap();

    assert_eq!(report.partial(), 1);
    match &report.files[0].outcome {
        FileOutcome::Partial { records, errors } => {
            assert!(*records > 0 && *records < 40);
            assert_eq!(errors.len(), 1);
        }
        other => panic!("expected partial outcome, got {:?}", other),
    }
    assert!(!report.snapshot.contains_key(b"key_000"));
    assert_eq!(report.snapshot.get(b"key_039"), Some(&LiveValue::Text("value".to_string())));
}

/// Garbage after the last log record stops the segment but keeps its batches
#[test]
fn test_log_with_trailing_garbage() {
    let dir = TempDir::new().unwrap();

    let mut data = log_bytes(1, &["first", "second"]);
    data.extend_from_slice(&[0xaa, 0xbb, 0xcc]);
    write(dir.path(), "000002.log", &data);

    let report = Dumper::default().dump_dir(dir.path()).unwrap();

    assert_eq!(report.partial(), 1);
    assert_eq!(report.snapshot.len(), 2);
}

/// A log segment cut inside a batch keeps the operations before the cut
#[test]
fn test_truncated_log_keeps_prefix() {
    let dir = TempDir::new().unwrap();

    let data = log_bytes(1, &["alpha", "beta", "gamma"]);
    write(dir.path(), "000002.log", &data[..data.len() - 4]);

    let report = Dumper::default().dump_dir(dir.path()).unwrap();

    assert!(report.snapshot.contains_key(b"alpha"));
    assert!(report.snapshot.contains_key(b"beta"));
    assert!(!report.snapshot.contains_key(b"gamma"));
}

/// A segment cut inside a fragmented batch reports the unfinished batch
#[test]
fn test_blocked_framing_unfinished_batch() {
    let dir = TempDir::new().unwrap();

    let mut batch = WalBatch::new(1);
    for i in 0..100 {
        batch.put(format!("k{:03}", i).as_bytes(), &vec![0x01; 500]);
    }
    let mut writer = LogWriter::new();
    writer.add_batch(&batch);
    let data = writer.finish();
    write(dir.path(), "000003.log", &data[..40_000]);

    let report = Dumper::new(Options::default().wal_framing(WalFraming::Blocked))
        .dump_dir(dir.path())
        .unwrap();

    assert_eq!(report.partial(), 1);
    assert!(report.snapshot.contains_key(b"k000"));
    assert!(!report.snapshot.contains_key(b"k099"));
}

/// An empty log segment contributes nothing without error
#[test]
fn test_empty_log_segment() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "000001.log", &[]);

    let report = Dumper::default().dump_dir(dir.path()).unwrap();
    assert_eq!(report.complete(), 1);
    assert!(report.snapshot.is_empty());
}

/// A batch whose sequence numbers run past the limit fails only its segment
#[test]
fn test_sequence_overflow_in_log() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "000001.log", &log_bytes(u64::MAX, &["a", "b"]));
    write(dir.path(), "000002.log", &log_bytes(10, &["healthy"]));

    for framing in [WalFraming::Simple, WalFraming::Blocked] {
        let report = Dumper::new(Options::default().wal_framing(framing))
            .dump_dir(dir.path())
            .unwrap();

        assert_eq!(report.partial(), 1);
        assert_eq!(report.complete(), 1);
        let bad = report.files.iter().find(|f| f.path.ends_with("000001.log")).unwrap();
        match &bad.outcome {
            FileOutcome::Partial { records, errors } => {
                assert_eq!(*records, 0);
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("exceeds"), "{}", errors[0]);
            }
            other => panic!("expected partial outcome, got {:?}", other),
        }
        assert!(!report.snapshot.contains_key(b"a"));
        assert_eq!(report.snapshot.get(b"healthy"), Some(&LiveValue::Text("v".to_string())));
    }
}
