//! Cache behavior across whole scans.
//!
//! The store's own unit tests cover the snapshot format; these tests drive
//! the cache the way real runs do, through the scanner, and assert that
//! second runs skip hashing, that stale entries are rehashed, and that
//! pruning tracks the filesystem.

use dupewarden::cache::HashCache;
use dupewarden::config::{Config, DirectoryConfig, ResolvedConfig};
use dupewarden::scanner::{FileRecord, Scanner};
use filetime::FileTime;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn compiled(root: &Path) -> ResolvedConfig {
    Config {
        directories: vec![DirectoryConfig {
            path: root.to_path_buf(),
            ..DirectoryConfig::default()
        }],
        ..Config::default()
    }
    .compile()
    .unwrap()
}

fn record_named<'a>(records: &'a [FileRecord], name: &str) -> &'a FileRecord {
    records
        .iter()
        .find(|r| r.path.file_name().is_some_and(|n| n == name))
        .unwrap_or_else(|| panic!("no record named {name}"))
}

#[test]
fn test_second_scan_hits_cache() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("data");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.txt"), b"first contents").unwrap();
    fs::write(root.join("b.txt"), b"second contents").unwrap();
    let snapshot = tmp.path().join("cache.json");
    let config = compiled(&root);

    let cache = HashCache::open(&snapshot).unwrap();
    let first = Scanner::new(&config, &cache).scan();
    assert_eq!(first.stats.files_hashed, 2);
    assert_eq!(first.stats.cache_hits, 0);
    cache.persist(&snapshot).unwrap();

    let reloaded = HashCache::open(&snapshot).unwrap();
    let second = Scanner::new(&config, &reloaded).scan();
    assert_eq!(second.stats.files_hashed, 0);
    assert_eq!(second.stats.cache_hits, 2);

    // Cached hashes are the same hashes.
    for name in ["a.txt", "b.txt"] {
        assert_eq!(
            record_named(&first.records, name).hash,
            record_named(&second.records, name).hash
        );
    }
}

#[test]
fn test_modified_file_is_rehashed() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("data");
    fs::create_dir_all(&root).unwrap();
    let stable = root.join("stable.txt");
    let volatile = root.join("volatile.txt");
    fs::write(&stable, b"never changes").unwrap();
    fs::write(&volatile, b"version one").unwrap();
    filetime::set_file_mtime(&volatile, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();
    let snapshot = tmp.path().join("cache.json");
    let config = compiled(&root);

    let cache = HashCache::open(&snapshot).unwrap();
    let first = Scanner::new(&config, &cache).scan();
    let old_hash = record_named(&first.records, "volatile.txt").hash;
    cache.persist(&snapshot).unwrap();

    fs::write(&volatile, b"version two").unwrap();
    filetime::set_file_mtime(&volatile, FileTime::from_unix_time(1_700_000_060, 0)).unwrap();

    let reloaded = HashCache::open(&snapshot).unwrap();
    let second = Scanner::new(&config, &reloaded).scan();
    assert_eq!(second.stats.cache_hits, 1);
    assert_eq!(second.stats.files_hashed, 1);
    assert_ne!(record_named(&second.records, "volatile.txt").hash, old_hash);
    assert!(record_named(&second.records, "stable.txt").cache_hit);
}

#[test]
fn test_corrupt_snapshot_recovers_on_next_run() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("data");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.txt"), b"contents a").unwrap();
    fs::write(root.join("b.txt"), b"contents b").unwrap();
    let snapshot = tmp.path().join("cache.json");
    fs::write(&snapshot, "not a snapshot").unwrap();
    let config = compiled(&root);

    let cache = HashCache::open(&snapshot).unwrap();
    assert!(cache.is_empty());

    let outcome = Scanner::new(&config, &cache).scan();
    assert_eq!(outcome.stats.files_hashed, 2);
    cache.persist(&snapshot).unwrap();

    // The rewritten snapshot is usable again.
    let reloaded = HashCache::open(&snapshot).unwrap();
    assert_eq!(reloaded.len(), 2);
}

#[test]
fn test_prune_drops_vanished_files() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("data");
    fs::create_dir_all(&root).unwrap();
    let kept_file = root.join("a.txt");
    let doomed = root.join("b.txt");
    fs::write(&kept_file, b"contents a").unwrap();
    fs::write(&doomed, b"contents b").unwrap();
    let snapshot = tmp.path().join("cache.json");
    let config = compiled(&root);

    let cache = HashCache::open(&snapshot).unwrap();
    Scanner::new(&config, &cache).scan();
    cache.persist(&snapshot).unwrap();

    fs::remove_file(&doomed).unwrap();

    let reloaded = HashCache::open(&snapshot).unwrap();
    let outcome = Scanner::new(&config, &reloaded).scan();
    assert_eq!(outcome.stats.cache_hits, 1);
    assert_eq!(reloaded.prune(), 1);
    reloaded.persist(&snapshot).unwrap();

    let survivor = fs::metadata(&kept_file).unwrap();
    let last = HashCache::open(&snapshot).unwrap();
    assert_eq!(last.len(), 1);
    assert!(last
        .lookup(
            &kept_file.canonicalize().unwrap(),
            survivor.len(),
            survivor.modified().unwrap()
        )
        .is_some());
}
