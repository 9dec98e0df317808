use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sqldump_csv::config::ConvertConfig;
use sqldump_csv::scanner::{DumpScanner, SMALL_BUFFER_SIZE};
use sqldump_csv::tokenizer::TupleTokenizer;
use std::hint::black_box;
use tempfile::TempDir;

fn generate_payload(tuples: usize) -> Vec<u8> {
    let mut data = Vec::new();
    for i in 0..tuples {
        if i > 0 {
            data.push(b',');
        }
        data.extend_from_slice(
            format!(
                "({},'User {}','user{}@example.com',NULL,'It\\'s a note, with (parens)',{}.5)",
                i, i, i, i
            )
            .as_bytes(),
        );
    }
    data.push(b';');
    data
}

fn generate_dump(tables: usize, statements_per_table: usize) -> Vec<u8> {
    let mut data = Vec::new();
    let payload = generate_payload(100);
    for t in 0..tables {
        data.extend_from_slice(
            format!(
                "CREATE TABLE `table_{}` (\n  `id` int(11) NOT NULL,\n  `name` varchar(255) NOT NULL,\n  `email` varchar(255) DEFAULT NULL,\n  `extra` text,\n  `note` text,\n  `score` double DEFAULT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB;\n",
                t
            )
            .as_bytes(),
        );
        for _ in 0..statements_per_table {
            data.extend_from_slice(format!("INSERT INTO `table_{}` VALUES ", t).as_bytes());
            data.extend_from_slice(&payload);
            data.push(b'\n');
        }
    }
    data
}

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenizer");
    let tokenizer = TupleTokenizer::new();

    for tuples in [10, 100, 1000] {
        let payload = generate_payload(tuples);
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("tokenize", format!("{}_tuples", tuples)),
            &payload,
            |b, payload| {
                let mut out = Vec::with_capacity(payload.len());
                b.iter(|| {
                    out.clear();
                    let mut arity = None;
                    tokenizer
                        .tokenize(black_box(payload), &mut arity, &mut out)
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scanner");
    group.sample_size(20);

    let dump = generate_dump(5, 50);
    group.throughput(Throughput::Bytes(dump.len() as u64));
    group.bench_function("scan_5_tables", |b| {
        b.iter_with_setup(
            || TempDir::new().unwrap(),
            |dir| {
                let mut scanner =
                    DumpScanner::from_config(dir.path().to_path_buf(), &ConvertConfig::default())
                        .unwrap();
                scanner.scan(&dump[..], SMALL_BUFFER_SIZE).unwrap()
            },
        )
    });

    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_scan);
criterion_main!(benches);
