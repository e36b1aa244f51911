//! End-to-end hardlink sweeps.
//!
//! Inode assertions only make sense on Unix, so the whole suite is gated.

#![cfg(unix)]

use clap::Parser;
use dupewarden::cli::Cli;
use dupewarden::error::ExitCode;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("dupewarden.toml");
    fs::write(&path, body).unwrap();
    path
}

fn run(args: &[&str]) -> ExitCode {
    let cli = Cli::try_parse_from(std::iter::once("dupewarden").chain(args.iter().copied()))
        .unwrap();
    dupewarden::run_app(cli).unwrap()
}

fn inode(path: &Path) -> u64 {
    fs::metadata(path).unwrap().ino()
}

#[test]
fn test_hardlink_policy_links_duplicate_to_kept_copy() {
    let tmp = tempdir().unwrap();
    let masters = tmp.path().join("masters");
    let mirror = tmp.path().join("mirror");
    fs::create_dir_all(&masters).unwrap();
    fs::create_dir_all(&mirror).unwrap();
    let kept = masters.join("x.txt");
    let linked = mirror.join("x.txt");
    fs::write(&kept, b"shared contents").unwrap();
    fs::write(&linked, b"shared contents").unwrap();
    assert_ne!(inode(&kept), inode(&linked));

    let config = write_config(
        &tmp,
        &format!(
            r"
[[directories]]
path = '{masters}'
priority = 2
policy = 'keep'

[[directories]]
path = '{mirror}'
priority = 1
policy = 'hardlink'
",
            masters = masters.display(),
            mirror = mirror.display()
        ),
    );
    let cache = tmp.path().join("cache.json");

    let code = run(&[
        "--config",
        config.to_str().unwrap(),
        "--cache",
        cache.to_str().unwrap(),
    ]);

    assert_eq!(code, ExitCode::Success);
    assert!(kept.exists());
    assert!(linked.exists());
    assert_eq!(inode(&kept), inode(&linked));
    assert_eq!(fs::read(&linked).unwrap(), b"shared contents");
}

#[test]
fn test_rescan_leaves_existing_links_alone() {
    let tmp = tempdir().unwrap();
    let masters = tmp.path().join("masters");
    let mirror = tmp.path().join("mirror");
    fs::create_dir_all(&masters).unwrap();
    fs::create_dir_all(&mirror).unwrap();
    let kept = masters.join("x.txt");
    let linked = mirror.join("x.txt");
    fs::write(&kept, b"shared contents").unwrap();
    fs::write(&linked, b"shared contents").unwrap();

    let config = write_config(
        &tmp,
        &format!(
            r"
[[directories]]
path = '{masters}'
priority = 2
policy = 'keep'

[[directories]]
path = '{mirror}'
priority = 1
policy = 'hardlink'
",
            masters = masters.display(),
            mirror = mirror.display()
        ),
    );
    let cache = tmp.path().join("cache.json");
    let config_arg = config.to_str().unwrap();
    let cache_arg = cache.to_str().unwrap();

    assert_eq!(run(&["--config", config_arg, "--cache", cache_arg]), ExitCode::Success);
    let linked_inode = inode(&linked);
    assert_eq!(inode(&kept), linked_inode);

    // The second sweep sees one inode twice and reports nothing to do.
    let csv = tmp.path().join("second.csv");
    let code = run(&[
        "--config",
        config_arg,
        "--cache",
        cache_arg,
        "--report-csv",
        csv.to_str().unwrap(),
    ]);

    assert_eq!(code, ExitCode::Success);
    assert!(kept.exists());
    assert!(linked.exists());
    assert_eq!(inode(&linked), linked_inode);
    let log = fs::read_to_string(&csv).unwrap();
    assert!(!log.contains("hardlinked"));
}

#[test]
fn test_hardlink_within_one_directory() {
    let tmp = tempdir().unwrap();
    let photos = tmp.path().join("photos");
    fs::create_dir_all(&photos).unwrap();
    let first = photos.join("a.jpg");
    let second = photos.join("b.jpg");
    fs::write(&first, b"pixel data").unwrap();
    fs::write(&second, b"pixel data").unwrap();

    let config = write_config(
        &tmp,
        &format!(
            r"
[[directories]]
path = '{photos}'
policy = 'hardlink'
",
            photos = photos.display()
        ),
    );
    let cache = tmp.path().join("cache.json");

    let code = run(&[
        "--config",
        config.to_str().unwrap(),
        "--cache",
        cache.to_str().unwrap(),
    ]);

    assert_eq!(code, ExitCode::Success);
    assert!(first.exists());
    assert!(second.exists());
    assert_eq!(inode(&first), inode(&second));
}
