use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wsync_fs::{NormalizedPath, io};

#[test]
fn test_write_atomic_creates_file_and_parents() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("packages/a/tsconfig.json"));

    io::write_atomic(&path, b"{}").unwrap();

    let content = fs::read_to_string(path.to_native()).unwrap();
    assert_eq!(content, "{}");
}

#[test]
fn test_write_atomic_overwrites_without_leaving_temp_files() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("package.json");
    fs::write(&file_path, "original").unwrap();

    let path = NormalizedPath::new(&file_path);
    io::write_atomic(&path, b"updated").unwrap();

    assert_eq!(fs::read_to_string(&file_path).unwrap(), "updated");
    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}

#[test]
fn test_read_json_if_exists_missing_file() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("absent.json"));
    assert_eq!(io::read_json_if_exists(&path).unwrap(), None);
}

#[test]
fn test_read_json_reports_parse_errors() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("broken.json");
    fs::write(&file_path, "{\"name\": ").unwrap();

    let err = io::read_json(&NormalizedPath::new(&file_path)).unwrap_err();
    assert!(matches!(err, wsync_fs::Error::JsonParse { .. }), "got {err:?}");
    assert!(!err.is_not_found());
}

#[test]
fn test_write_json_is_pretty_with_trailing_newline() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("package.json"));

    io::write_json(&path, &json!({ "name": "a", "private": true })).unwrap();

    let content = fs::read_to_string(path.to_native()).unwrap();
    assert_eq!(content, "{\n  \"name\": \"a\",\n  \"private\": true\n}\n");
}

#[test]
fn test_remove_dir_all() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("packages/empty");
    fs::create_dir_all(&dir).unwrap();

    io::remove_dir_all(&NormalizedPath::new(&dir)).unwrap();
    assert!(!dir.exists());
}
