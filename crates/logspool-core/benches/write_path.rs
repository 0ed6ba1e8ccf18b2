use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use logspool_core::guard::FixedSpaceProbe;
use logspool_core::{LogConfig, LogWriter, WriteMode};
use tempfile::TempDir;

const MESSAGES_PER_ITER: u64 = 256;

fn bench_write_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_path");
    group.throughput(Throughput::Elements(MESSAGES_PER_ITER));

    for (label, mode, collect) in [
        ("single", WriteMode::Single, 1000),
        ("collect-64", WriteMode::Collect, 64),
        ("collect-1000", WriteMode::Collect, 1000),
    ] {
        group.bench_with_input(BenchmarkId::new("write", label), &mode, |b, &mode| {
            let dir = TempDir::new().expect("temp dir");
            let writer = LogWriter::with_probe(
                LogConfig {
                    collect_log_size: collect,
                    max_log_file_size_kb: 64 * 1024,
                    ..LogConfig::default()
                },
                FixedSpaceProbe(u64::MAX),
            );
            let path = dir.path().join(format!("{label}.log"));

            b.iter(|| {
                for n in 0..MESSAGES_PER_ITER {
                    let outcome = writer.write(&path, "Bench", "payload", Some(mode));
                    black_box((n, outcome.is_ok()));
                }
            });
            writer.flush_all_pending();
        });
    }

    group.finish();
}

fn bench_split_chunks(c: &mut Criterion) {
    let body = "{\"k\":\"v\"},".repeat(2_000);
    c.bench_function("console.split_chunks", |b| {
        b.iter(|| black_box(logspool_core::console::split_chunks(&body, 3000).len()));
    });
}

criterion_group!(benches, bench_write_path, bench_split_chunks);
criterion_main!(benches);
