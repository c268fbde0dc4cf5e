//! Tests for YAML manifest loading.

use std::io::Write;

use camino::Utf8PathBuf;
use opforge::executor::Executor;
use opforge::manifest::{load_manifest, manifest_from_str};
use opforge::op::{con, map, var, with};
use opforge::value::Value;

fn write_manifest(content: &str) -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("manifest.yml"))
        .expect("temp path is not UTF-8");
    let mut file = std::fs::File::create(&path).expect("failed to create manifest");
    file.write_all(content.as_bytes())
        .expect("failed to write manifest");
    (dir, path)
}

#[test]
fn test_load_manifest_reads_scalars_lists_and_maps() {
    let (_dir, path) = write_manifest(
        "suite: bookworm\nconcurrency: 4\npackages:\n  - curl\n  - git\n",
    );
    let value = load_manifest(&path).unwrap();

    assert_eq!(value.attr("suite"), Some(Value::from("bookworm")));
    assert_eq!(value.attr("concurrency"), Some(Value::Int(4)));
    assert_eq!(
        value.attr("packages"),
        Some(Value::from(vec!["curl", "git"])),
    );
}

#[test]
fn test_load_manifest_missing_file() {
    let error = load_manifest(Utf8PathBuf::from("/nonexistent/manifest.yml").as_path())
        .unwrap_err();
    assert!(format!("{:#}", error).contains("/nonexistent/manifest.yml"));
}

#[test]
fn test_load_manifest_rejects_invalid_yaml() {
    let (_dir, path) = write_manifest("packages: [unclosed\n");
    assert!(load_manifest(&path).is_err());
}

#[test]
fn test_manifest_values_drive_programs() {
    let manifest = manifest_from_str("packages:\n  - curl\n  - git\n  - vim\n").unwrap();
    let program = with(
        "manifest",
        con(manifest),
        map(
            "pkg",
            var("pkg") + con("-dbg"),
            var("manifest").attr("packages"),
        ),
    );
    assert_eq!(
        Executor::new(false).execute(program).unwrap(),
        Value::from(vec!["curl-dbg", "git-dbg", "vim-dbg"]),
    );
}
