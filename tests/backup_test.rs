// Backup functionality integration tests

mod common;

use chrono::{Local, TimeZone};
use common::MockRunner;
use flate2::read::GzDecoder;
use rootfs_backup::backup::{build_archive, create_backup, BackupPlan};
use rootfs_backup::config::{ArchiveEngine, BackupConfig, Compression};
use rootfs_backup::RootfsError;
use std::fs;
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;

/// A small fake root with a few directories that must be skipped.
fn fake_root(dir: &Path) -> std::path::PathBuf {
    let root = dir.join("root");
    fs::create_dir_all(root.join("etc")).unwrap();
    fs::write(root.join("etc/hostname"), b"testhost\n").unwrap();
    fs::create_dir_all(root.join("home/alice")).unwrap();
    fs::write(root.join("home/alice/notes.txt"), b"remember the milk").unwrap();
    fs::create_dir_all(root.join("proc/1")).unwrap();
    fs::write(root.join("proc/1/status"), b"running").unwrap();
    fs::create_dir_all(root.join("tmp")).unwrap();
    fs::write(root.join("tmp/scratch"), b"junk").unwrap();
    fs::create_dir_all(root.join("var/cache")).unwrap();
    fs::write(root.join("var/cache/pkg"), b"cached").unwrap();
    fs::create_dir_all(root.join("processes")).unwrap();
    fs::write(root.join("processes/list"), b"kept").unwrap();
    root
}

fn backup_config(root: &Path, compression: Compression) -> BackupConfig {
    BackupConfig {
        output_dir: root.join("backups"),
        source_root: root.to_path_buf(),
        engine: ArchiveEngine::Builtin,
        compression,
        compression_level: None,
        exclude: vec!["/var/cache".to_string()],
    }
}

fn entry_names<R: Read>(reader: R) -> Vec<String> {
    let mut archive = tar::Archive::new(reader);
    archive
        .entries()
        .unwrap()
        .map(|e| {
            let e = e.unwrap();
            let name = e.path().unwrap().to_string_lossy().into_owned();
            name.trim_end_matches('/').to_string()
        })
        .collect()
}

fn assert_expected_entries(names: &[String]) {
    for kept in ["etc", "etc/hostname", "home/alice/notes.txt", "processes/list"] {
        assert!(names.iter().any(|n| n == kept), "missing {kept}: {names:?}");
    }
    for skipped in ["proc", "proc/1/status", "tmp/scratch", "var/cache/pkg"] {
        assert!(!names.iter().any(|n| n == skipped), "kept {skipped}: {names:?}");
    }
    assert!(!names.iter().any(|n| n.ends_with(".tar.gz") || n.ends_with(".tar.zst")));
    assert!(!names.iter().any(|n| n.is_empty()));
}

#[test]
fn test_builtin_gzip_archive_skips_excluded_paths() {
    let temp_dir = TempDir::new().unwrap();
    let root = fake_root(temp_dir.path());
    let config = backup_config(&root, Compression::Gzip);
    let plan = BackupPlan::new(&config, Local::now());

    fs::create_dir_all(&config.output_dir).unwrap();
    build_archive(&plan).unwrap();

    let file = fs::File::open(&plan.archive).unwrap();
    let names = entry_names(GzDecoder::new(file));
    assert_expected_entries(&names);
}

#[test]
fn test_builtin_zstd_archive_skips_excluded_paths() {
    let temp_dir = TempDir::new().unwrap();
    let root = fake_root(temp_dir.path());
    let config = backup_config(&root, Compression::Zstd);
    let plan = BackupPlan::new(&config, Local::now());
    assert!(plan.archive.to_string_lossy().ends_with(".tar.zst"));

    fs::create_dir_all(&config.output_dir).unwrap();
    build_archive(&plan).unwrap();

    let file = fs::File::open(&plan.archive).unwrap();
    let names = entry_names(zstd::Decoder::new(file).unwrap());
    assert_expected_entries(&names);
}

#[test]
fn test_builtin_archive_preserves_contents() {
    let temp_dir = TempDir::new().unwrap();
    let root = fake_root(temp_dir.path());
    let config = backup_config(&root, Compression::Gzip);
    let plan = BackupPlan::new(&config, Local::now());

    fs::create_dir_all(&config.output_dir).unwrap();
    build_archive(&plan).unwrap();

    let file = fs::File::open(&plan.archive).unwrap();
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut found = false;
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        if entry.path().unwrap() == Path::new("etc/hostname") {
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            assert_eq!(content, "testhost\n");
            found = true;
        }
    }
    assert!(found);
}

#[tokio::test]
async fn test_create_backup_with_builtin_engine() {
    let temp_dir = TempDir::new().unwrap();
    let root = fake_root(temp_dir.path());
    let config = backup_config(&root, Compression::Gzip);
    let now = Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let plan = BackupPlan::new(&config, now);
    let runner = MockRunner::new();

    let archive = create_backup(&plan, &runner).await.unwrap();

    assert_eq!(archive, root.join("backups/backup-20240101-120000.tar.gz"));
    assert!(fs::metadata(&archive).unwrap().len() > 0);
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_tar_files_changed_is_tolerated() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = BackupConfig::default();
    config.output_dir = temp_dir.path().join("out");
    let plan = BackupPlan::new(&config, Local::now());
    let runner = MockRunner::new().fail("tar", 1, "tar: /var/log/syslog: file changed as we read it");

    let archive = create_backup(&plan, &runner).await.unwrap();
    assert!(archive.exists());
    assert_eq!(runner.programs(), vec!["tar"]);
}

#[tokio::test]
async fn test_tar_fatal_error_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = BackupConfig::default();
    config.output_dir = temp_dir.path().join("out");
    let plan = BackupPlan::new(&config, Local::now());
    let runner = MockRunner::new().fail("tar", 2, "tar: Cannot open: No space left on device");

    let err = create_backup(&plan, &runner).await.unwrap_err();
    match err {
        RootfsError::CommandFailed { program, code, stderr } => {
            assert_eq!(program, "tar");
            assert_eq!(code, Some(2));
            assert!(stderr.contains("No space left"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_tar_creates_output_directory() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = BackupConfig::default();
    config.output_dir = temp_dir.path().join("nested/out");
    let plan = BackupPlan::new(&config, Local::now());
    let runner = MockRunner::new();

    create_backup(&plan, &runner).await.unwrap();
    assert!(config.output_dir.is_dir());
}
