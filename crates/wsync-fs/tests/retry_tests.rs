use std::fs;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wsync_fs::{Error, NormalizedPath, RetryPolicy, read_json_retrying};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
        ..RetryPolicy::default()
    }
}

#[tokio::test]
async fn test_reads_valid_document_first_try() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("tsconfig.tsbuildinfo");
    fs::write(&file_path, r#"{"program":{"fileNames":[]}}"#).unwrap();

    let value = read_json_retrying(&NormalizedPath::new(&file_path), fast_policy(3))
        .await
        .unwrap();
    assert_eq!(value, json!({ "program": { "fileNames": [] } }));
}

#[tokio::test]
async fn test_gives_up_after_max_attempts_on_torn_document() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("tsconfig.tsbuildinfo");
    fs::write(&file_path, r#"{"program":{"fileNa"#).unwrap();

    let err = read_json_retrying(&NormalizedPath::new(&file_path), fast_policy(4))
        .await
        .unwrap_err();
    match err {
        Error::ReadFailure { attempts, .. } => assert_eq!(attempts, 4),
        other => panic!("expected ReadFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_file_counts_as_failure() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("absent.tsbuildinfo"));

    let err = read_json_retrying(&path, fast_policy(2)).await.unwrap_err();
    assert!(matches!(err, Error::ReadFailure { attempts: 2, .. }));
}

#[tokio::test]
async fn test_recovers_when_writer_finishes() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("tsconfig.tsbuildinfo");
    fs::write(&file_path, r#"{"program":"#).unwrap();

    let writer_path = file_path.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        fs::write(&writer_path, r#"{"program":{"fileNames":["a.ts"]}}"#).unwrap();
    });

    let policy = RetryPolicy {
        max_attempts: 50,
        base_delay: Duration::from_millis(5),
        multiplier: 1.0,
        ..RetryPolicy::default()
    };
    let value = read_json_retrying(&NormalizedPath::new(&file_path), policy)
        .await
        .unwrap();
    writer.await.unwrap();

    assert_eq!(value["program"]["fileNames"][0], "a.ts");
}
