//! Atomic I/O operations with file locking

use std::fs::{self, OpenOptions};
use std::io::Write;

use fs2::FileExt;
use serde::Serialize;
use serde_json::Value;

use crate::{Error, NormalizedPath, Result};

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename strategy to prevent partial writes.
/// Acquires an advisory lock to prevent concurrent access.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let native_path = path.to_native();

    // Ensure parent directory exists
    if let Some(parent) = native_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Temp file lives in the same directory so the rename stays on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    fs::rename(&temp_path, &native_path).map_err(|e| Error::io(&native_path, e))?;

    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Read and parse a JSON document.
pub fn read_json(path: &NormalizedPath) -> Result<Value> {
    let content = read_text(path)?;
    serde_json::from_str(&content).map_err(|e| Error::JsonParse {
        path: path.to_native(),
        message: e.to_string(),
    })
}

/// Read and parse a JSON document, returning `None` when the file is absent.
pub fn read_json_if_exists(path: &NormalizedPath) -> Result<Option<Value>> {
    match read_json(path) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Render a value the way wsync writes documents: two-space indent and a
/// trailing newline.
pub fn to_pretty_json<T: Serialize>(path: &NormalizedPath, value: &T) -> Result<String> {
    let mut rendered = serde_json::to_string_pretty(value).map_err(|e| Error::JsonSerialize {
        path: path.to_native(),
        message: e.to_string(),
    })?;
    rendered.push('\n');
    Ok(rendered)
}

/// Serialize a value as pretty JSON and write it atomically.
pub fn write_json<T: Serialize>(path: &NormalizedPath, value: &T) -> Result<()> {
    let rendered = to_pretty_json(path, value)?;
    write_atomic(path, rendered.as_bytes())
}

/// Remove a directory and everything below it.
pub fn remove_dir_all(path: &NormalizedPath) -> Result<()> {
    let native_path = path.to_native();
    fs::remove_dir_all(&native_path).map_err(|e| Error::io(&native_path, e))
}
