// Decode performance benchmarks for leveldump

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use leveldump::config::WalFraming;
use leveldump::internal_key::{join, ValueType};
use leveldump::sstable::{decode_block, read_table, BlockBuilder, CompressionType, TableBuilder};
use leveldump::wal::{read_log, LogWriter, WalBatch};
use leveldump::{Dumper, Options};
use rand::Rng;
use std::hint::black_box;
use tempfile::TempDir;

fn random_value(rng: &mut impl Rng, len: usize) -> Vec<u8> {
    let mut value = vec![0x01];
    value.extend((0..len).map(|_| rng.random_range(b'a'..=b'z')));
    value
}

fn benchmark_block_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_decode");
    let mut rng = rand::rng();

    for entries in [16, 128, 1024].iter() {
        let mut builder = BlockBuilder::new(16);
        for i in 0..*entries {
            let key = join(format!("key{:08}", i).as_bytes(), i as u64 + 1, ValueType::Value);
            builder.add(&key, &random_value(&mut rng, 32));
        }
        let block = builder.finish();

        group.throughput(Throughput::Elements(*entries as u64));
        group.bench_with_input(BenchmarkId::from_parameter(entries), &block, |b, block| {
            b.iter(|| black_box(decode_block(block.clone())));
        });
    }

    group.finish();
}

fn benchmark_table_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_read");
    let mut rng = rand::rng();

    for (name, compression) in [("none", CompressionType::None), ("snappy", CompressionType::Snappy)] {
        let mut builder = TableBuilder::new().compression(compression);
        for i in 0..10_000u64 {
            let key = format!("key{:08}", i);
            builder.add(key.as_bytes(), i + 1, ValueType::Value, &random_value(&mut rng, 64));
        }
        let table = Bytes::from(builder.finish());

        group.throughput(Throughput::Elements(10_000));
        group.bench_with_input(BenchmarkId::from_parameter(name), &table, |b, table| {
            b.iter(|| black_box(read_table(table.clone()).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_log_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_read");
    let mut rng = rand::rng();

    let mut writer = LogWriter::new();
    for b in 0..1000u64 {
        let mut batch = WalBatch::new(b * 10 + 1);
        for i in 0..10 {
            batch.put(format!("key{:04}_{}", b, i).as_bytes(), &random_value(&mut rng, 100));
        }
        writer.add_batch(&batch);
    }
    let log = Bytes::from(writer.finish());

    group.throughput(Throughput::Elements(10_000));
    for framing in [WalFraming::Simple, WalFraming::Blocked] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", framing)),
            &log,
            |b, log| {
                b.iter(|| black_box(read_log(log.clone(), framing)));
            },
        );
    }

    group.finish();
}

fn benchmark_directory_dump(c: &mut Criterion) {
    let mut group = c.benchmark_group("directory_dump");
    let mut rng = rand::rng();

    let temp_dir = TempDir::new().unwrap();
    for t in 0..8u64 {
        let mut builder = TableBuilder::new();
        for i in 0..2000u64 {
            let key = format!("key{:08}", i);
            builder.add(key.as_bytes(), t * 2000 + i + 1, ValueType::Value, &random_value(&mut rng, 48));
        }
        std::fs::write(temp_dir.path().join(format!("{:06}.ldb", t + 1)), builder.finish()).unwrap();
    }

    for parallel in [false, true] {
        let dumper = Dumper::new(Options::default().parallel(parallel));
        group.bench_function(BenchmarkId::new("parallel", parallel), |b| {
            b.iter(|| black_box(dumper.dump_dir(temp_dir.path()).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_block_decode,
    benchmark_table_read,
    benchmark_log_read,
    benchmark_directory_dump
);
criterion_main!(benches);
