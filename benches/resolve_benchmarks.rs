use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dupewarden::cache::HashCache;
use dupewarden::config::{CompiledFilter, Config, DirectoryConfig, Policy, ScanDirectory};
use dupewarden::duplicates::{group_by_hash, resolve_groups};
use dupewarden::scanner::{FileHasher, FileRecord, Scanner};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

// Synthetic records: `copies` files share each of `contents` distinct hashes.
fn synthetic_records(contents: usize, copies: usize, dirs: usize) -> Vec<FileRecord> {
    let mut records = Vec::with_capacity(contents * copies);
    for content in 0..contents {
        for copy in 0..copies {
            let dir_index = (content + copy) % dirs;
            let mut hash = [0u8; 32];
            hash[..8].copy_from_slice(&(content as u64).to_le_bytes());
            records.push(FileRecord {
                path: PathBuf::from(format!("/d{dir_index}/c{content:05}-{copy}.bin")),
                dir_index,
                size: 4096,
                modified: UNIX_EPOCH + Duration::from_secs((copy * 60) as u64),
                hash: Some(hash),
                cache_hit: false,
                rule_match: None,
            });
        }
    }
    records
}

fn synthetic_directories(dirs: usize) -> Vec<ScanDirectory> {
    (0..dirs)
        .map(|i| ScanDirectory {
            root: PathBuf::from(format!("/d{i}")),
            priority: (i % 3) as i64,
            max_depth: usize::MAX,
            policy: if i % 4 == 0 {
                Policy::Keep
            } else {
                Policy::Trash
            },
            rename: i % 2 == 0,
            skip_subdirs: HashSet::new(),
            include_hidden: false,
            rules: CompiledFilter::default(),
        })
        .collect()
}

// 1. Grouping Benchmarks
fn bench_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("grouping");
    for contents in [1_000, 10_000] {
        let records = synthetic_records(contents, 3, 4);
        group.bench_with_input(
            format!("{}_files", records.len()),
            &records,
            |b, records| {
                b.iter(|| {
                    let (groups, stats) = group_by_hash(records);
                    black_box((groups, stats));
                });
            },
        );
    }
    group.finish();
}

// 2. Resolution Benchmarks
fn bench_resolution(c: &mut Criterion) {
    let mut bench = c.benchmark_group("resolution");
    for copies in [2, 8] {
        let records = synthetic_records(5_000, copies, 6);
        let directories = synthetic_directories(6);
        let (groups, _) = group_by_hash(&records);
        bench.bench_with_input(
            format!("5000_groups_of_{copies}"),
            &groups,
            |b, groups| {
                b.iter(|| {
                    let resolutions = resolve_groups(groups, &records, &directories);
                    black_box(resolutions);
                });
            },
        );
    }
    bench.finish();
}

// 3. Hashing Benchmarks
fn bench_hasher(c: &mut Criterion) {
    let mut group = c.benchmark_group("hasher");
    let hasher = FileHasher::new(64 * 1024 * 1024);

    for size_kb in [4, 1024, 16 * 1024] {
        let data = vec![b'a'; size_kb * 1024];
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("bench_file.dat");
        fs::write(&file_path, &data).expect("Failed to write bench file");

        group.bench_with_input(format!("blake3_{}KB", size_kb), &file_path, |b, path| {
            b.iter(|| {
                let hash = hasher.hash_file(path, (size_kb * 1024) as u64).unwrap();
                black_box(hash);
            });
        });
    }
    group.finish();
}

// 4. Scan Pipeline Benchmarks
fn bench_scan(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    for i in 0..50 {
        fs::write(
            temp_dir.path().join(format!("unique_{i:02}.txt")),
            format!("unique contents {i}"),
        )
        .expect("Failed to write bench file");
        fs::write(
            temp_dir.path().join(format!("copy_{i:02}.txt")),
            "shared contents",
        )
        .expect("Failed to write bench file");
    }

    let config = Config {
        directories: vec![DirectoryConfig {
            path: temp_dir.path().to_path_buf(),
            ..DirectoryConfig::default()
        }],
        ..Config::default()
    }
    .compile()
    .unwrap();

    c.bench_function("scan_100_files_cold", |b| {
        b.iter(|| {
            let cache = HashCache::new();
            let outcome = Scanner::new(&config, &cache).scan();
            black_box(outcome);
        })
    });

    let warm_cache = HashCache::new();
    Scanner::new(&config, &warm_cache).scan();
    c.bench_function("scan_100_files_cached", |b| {
        b.iter(|| {
            let outcome = Scanner::new(&config, &warm_cache).scan();
            black_box(outcome);
        })
    });
}

criterion_group!(
    benches,
    bench_grouping,
    bench_resolution,
    bench_hasher,
    bench_scan
);
criterion_main!(benches);
