//! [`TestMonorepo`] builder for wsync test scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;

use crate::artifact::BuildInfoBuilder;

/// A temporary monorepo with helpers for writing workspace files and
/// asserting on what wsync wrote back.
///
/// # Example
///
/// ```rust,no_run
/// use wsync_test_utils::TestMonorepo;
///
/// let repo = TestMonorepo::new();
/// repo.write_root_manifest(&["packages/*"]);
/// repo.write_workspace("packages/a", "a", &[]);
/// repo.write_workspace_config("packages/a");
/// repo.assert_file_exists("packages/a/tsconfig.json");
/// ```
pub struct TestMonorepo {
    temp_dir: TempDir,
    root: PathBuf,
}

impl Default for TestMonorepo {
    fn default() -> Self {
        Self::new()
    }
}

impl TestMonorepo {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        Self { temp_dir, root }
    }

    /// Canonical root path of the temporary directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The underlying temporary directory.
    pub fn temp_dir(&self) -> &TempDir {
        &self.temp_dir
    }

    /// Absolute path of a root-relative path.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Write `value` as pretty JSON with a trailing newline, creating parents.
    pub fn write_json(&self, relative: &str, value: &Value) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut content = serde_json::to_string_pretty(value).unwrap();
        content.push('\n');
        fs::write(path, content).unwrap();
    }

    /// Write raw text, creating parents.
    pub fn write_text(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Create an empty directory.
    pub fn create_dir(&self, relative: &str) {
        fs::create_dir_all(self.path(relative)).unwrap();
    }

    /// Write the root `package.json` declaring `workspaces`.
    pub fn write_root_manifest(&self, workspaces: &[&str]) {
        self.write_json(
            "package.json",
            &json!({ "name": "monorepo", "private": true, "workspaces": workspaces }),
        );
    }

    /// Write `<dir>/package.json` with `name` and wildcard `dependencies`.
    pub fn write_workspace(&self, dir: &str, name: &str, dependencies: &[&str]) {
        let mut manifest = json!({ "name": name, "version": "0.0.0" });
        if !dependencies.is_empty() {
            let deps: serde_json::Map<String, Value> = dependencies
                .iter()
                .map(|dep| (dep.to_string(), json!("*")))
                .collect();
            manifest["dependencies"] = Value::Object(deps);
        }
        self.write_json(&format!("{dir}/package.json"), &manifest);
    }

    /// Write `<dir>/tsconfig.json` with the canonical workspace settings.
    pub fn write_workspace_config(&self, dir: &str) {
        self.write_json(
            &format!("{dir}/tsconfig.json"),
            &json!({
                "compilerOptions": {
                    "composite": true,
                    "outDir": ".ts",
                    "tsBuildInfoFile": ".ts/tsconfig.tsbuildinfo"
                }
            }),
        );
    }

    /// Write `<dir>/.ts/tsconfig.tsbuildinfo`.
    pub fn write_build_info(&self, dir: &str, info: &BuildInfoBuilder) {
        self.write_json(&format!("{dir}/.ts/tsconfig.tsbuildinfo"), &info.build());
    }

    /// Read and parse a JSON file.
    ///
    /// # Panics
    /// Panics if the file is missing or not valid JSON.
    pub fn read_json(&self, relative: &str) -> Value {
        let path = self.path(relative);
        let content = fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", path.display()));
        serde_json::from_str(&content)
            .unwrap_or_else(|e| panic!("Invalid JSON in {}: {e}", path.display()))
    }

    /// Raw file content.
    pub fn read_text(&self, relative: &str) -> String {
        let path = self.path(relative);
        fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", path.display()))
    }

    /// Modification time of a file, for asserting that nothing was rewritten.
    pub fn modified(&self, relative: &str) -> std::time::SystemTime {
        fs::metadata(self.path(relative))
            .and_then(|m| m.modified())
            .unwrap()
    }

    /// Remove a file or directory tree.
    pub fn remove(&self, relative: &str) {
        let path = self.path(relative);
        if path.is_dir() {
            fs::remove_dir_all(path).unwrap();
        } else {
            fs::remove_file(path).unwrap();
        }
    }

    /// Reference paths of a config, in document order.
    pub fn references(&self, relative: &str) -> Vec<String> {
        self.read_json(relative)["references"]
            .as_array()
            .map(|refs| {
                refs.iter()
                    .filter_map(|r| r["path"].as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Assert that `path` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.path(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the root) does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.path(path);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the JSON file at `path` has `expected` at the JSON pointer `pointer`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or the value differs.
    pub fn assert_json_at(&self, path: &str, pointer: &str, expected: &Value) {
        let document = self.read_json(path);
        let actual = document.pointer(pointer);
        assert_eq!(
            actual,
            Some(expected),
            "{path} at {pointer}: expected {expected}, found {actual:?}\nDocument: {document:#}"
        );
    }
}
