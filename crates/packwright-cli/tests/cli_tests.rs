//! Integration tests for packwright-cli.
//!
//! Note: Tests use `unwrap`/`expect` which is acceptable in test code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use packwright_core::ArchiverResult;
use packwright_core::test_utils::read_tar;
use packwright_core::test_utils::read_zip;
use packwright_core::test_utils::tar_names;
use packwright_core::test_utils::zip_names;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn packwright_cmd() -> Command {
    cargo_bin_cmd!("packwright")
}

/// `source/a.txt` ("hello") and `source/sub/b.txt` ("world").
fn source_tree(temp: &TempDir) -> PathBuf {
    let source = temp.path().join("source");
    fs::create_dir_all(source.join("sub")).unwrap();
    fs::write(source.join("a.txt"), "hello").unwrap();
    fs::write(source.join("sub/b.txt"), "world").unwrap();
    source
}

#[test]
fn test_version_flag() {
    packwright_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("packwright"));
}

#[test]
fn test_help_flag() {
    packwright_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("checksum"));
}

#[test]
fn test_create_help() {
    packwright_cmd()
        .arg("create")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Create a new archive"))
        .stdout(predicate::str::contains("--keep-symlinks"));
}

#[test]
fn test_create_zip_basic() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let source = source_tree(&temp);
    let archive = temp.path().join("out.zip");

    packwright_cmd()
        .arg("create")
        .arg(&archive)
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("Archive created"))
        .stdout(predicate::str::contains("SHA-256"));

    assert_eq!(
        zip_names(&read_zip(&archive)),
        vec!["a.txt", "sub/", "sub/b.txt"]
    );
}

#[test]
fn test_create_zip_with_exclude() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let source = source_tree(&temp);
    let archive = temp.path().join("out.zip");

    packwright_cmd()
        .arg("create")
        .arg(&archive)
        .arg(&source)
        .arg("--exclude")
        .arg(source.join("sub"))
        .assert()
        .success();

    let entries = read_zip(&archive);
    assert_eq!(zip_names(&entries), vec!["a.txt"]);
    assert_eq!(entries[0].content, b"hello");
}

#[test]
fn test_create_tar_multiple_sources_and_content() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let source = source_tree(&temp);
    let notes = temp.path().join("NOTES.md");
    fs::write(&notes, "notes").unwrap();
    let archive = temp.path().join("bundle.tgz");

    packwright_cmd()
        .arg("create")
        .arg(&archive)
        .arg(&source)
        .arg(&notes)
        .arg("--content")
        .arg("VERSION=1.0.0")
        .assert()
        .success();

    assert_eq!(
        tar_names(&read_tar(&archive)),
        vec![
            "source",
            "source/a.txt",
            "source/sub",
            "source/sub/b.txt",
            "NOTES.md",
            "VERSION"
        ]
    );
}

#[test]
fn test_create_format_flag_overrides_extension() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let source = source_tree(&temp);
    let archive = temp.path().join("bundle.bin");

    packwright_cmd()
        .arg("create")
        .arg("--format")
        .arg("tar")
        .arg(&archive)
        .arg(&source)
        .assert()
        .success();

    let data = fs::read(&archive).unwrap();
    assert_eq!(&data[0..2], &[0x1f, 0x8b]);
}

#[test]
fn test_create_unknown_extension_fails() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let source = source_tree(&temp);

    packwright_cmd()
        .arg("create")
        .arg(temp.path().join("bundle.rar"))
        .arg(&source)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot detect archive format"))
        .stderr(predicate::str::contains("HINT"));
}

#[test]
fn test_create_json_output() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let source = source_tree(&temp);
    let archive = temp.path().join("out.tar.gz");

    let output = packwright_cmd()
        .arg("--json")
        .arg("create")
        .arg(&archive)
        .arg(&source)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("invalid JSON output");
    assert_eq!(json["status"], "success");
    assert_eq!(json["operation"], "create");
    assert_eq!(json["data"]["format"], "tar");

    let result = ArchiverResult::from_path(&archive).unwrap();
    assert_eq!(json["data"]["sha256"], result.sha256);
    assert_eq!(json["data"]["md5"], result.md5);
    assert_eq!(json["data"]["size"], result.size);
}

#[test]
fn test_create_output_exists_without_force() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let source = source_tree(&temp);
    let archive = temp.path().join("exists.zip");

    packwright_cmd()
        .arg("create")
        .arg(&archive)
        .arg(&source)
        .assert()
        .success();

    packwright_cmd()
        .arg("create")
        .arg(&archive)
        .arg(&source)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    packwright_cmd()
        .arg("create")
        .arg("--force")
        .arg(&archive)
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("Overwriting"));
}

#[test]
fn test_create_missing_source_removes_output() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = temp.path().join("out.zip");

    packwright_cmd()
        .arg("create")
        .arg(&archive)
        .arg(temp.path().join("missing"))
        .arg(temp.path().join("also-missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    assert!(!archive.exists());
}

#[cfg(unix)]
#[test]
fn test_create_file_mode() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().expect("failed to create temp dir");
    let source = source_tree(&temp);
    let archive = temp.path().join("private.zip");

    packwright_cmd()
        .arg("create")
        .arg("--file-mode")
        .arg("600")
        .arg(&archive)
        .arg(&source)
        .assert()
        .success();

    let mode = fs::metadata(&archive).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_create_invalid_file_mode() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let source = source_tree(&temp);

    packwright_cmd()
        .arg("create")
        .arg("--file-mode")
        .arg("rw-r--r--")
        .arg(temp.path().join("out.zip"))
        .arg(&source)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid octal mode"));
}

#[test]
fn test_create_quiet_mode() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let source = source_tree(&temp);

    packwright_cmd()
        .arg("--quiet")
        .arg("create")
        .arg(temp.path().join("out.zip"))
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_create_deterministic_tar_is_reproducible() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let source = source_tree(&temp);
    let first = temp.path().join("first.tar.gz");
    let second = temp.path().join("second.tar.gz");

    for archive in [&first, &second] {
        packwright_cmd()
            .arg("create")
            .arg("--deterministic")
            .arg(archive)
            .arg(&source)
            .assert()
            .success();
    }

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_checksum_matches_library() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let blob = temp.path().join("blob.bin");
    fs::write(&blob, "hello").unwrap();

    packwright_cmd()
        .arg("checksum")
        .arg(&blob)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
        ))
        .stdout(predicate::str::contains("5d41402abc4b2a76b9719d911017c592"))
        .stdout(predicate::str::contains("5 bytes"));
}

#[test]
fn test_checksum_quiet_prints_sha256_line() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let blob = temp.path().join("blob.bin");
    fs::write(&blob, "hello").unwrap();

    packwright_cmd()
        .arg("--quiet")
        .arg("checksum")
        .arg(&blob)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824  ",
        ));
}

#[test]
fn test_checksum_missing_file() {
    let temp = TempDir::new().expect("failed to create temp dir");

    packwright_cmd()
        .arg("checksum")
        .arg(temp.path().join("nope.zip"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_completion_bash() {
    packwright_cmd()
        .arg("completion")
        .arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("packwright"));
}
