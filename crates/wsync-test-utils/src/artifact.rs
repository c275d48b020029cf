//! [`BuildInfoBuilder`] for `tsconfig.tsbuildinfo` fixtures.

use serde_json::{Value, json};

/// Builds the indexed reference record the incremental compiler writes.
///
/// File names are given relative to the artifact directory (`<ws>/.ts`),
/// exactly as the compiler records them; ids are assigned in insertion
/// order, one-based.
///
/// # Example
///
/// ```rust
/// use wsync_test_utils::BuildInfoBuilder;
///
/// let info = BuildInfoBuilder::new()
///     .file("../src/index.ts")
///     .file("../../a/src/index.ts")
///     .reference("../src/index.ts", &["../../a/src/index.ts"])
///     .build();
/// assert_eq!(info["program"]["referencedMap"][0][0], 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BuildInfoBuilder {
    files: Vec<String>,
    references: Vec<(usize, Vec<usize>)>,
}

impl BuildInfoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compiled file.
    pub fn file(mut self, name: &str) -> Self {
        self.id_of(name);
        self
    }

    /// Record that `from` references each of `to`. Unknown files are registered.
    pub fn reference(mut self, from: &str, to: &[&str]) -> Self {
        let from = self.id_of(from);
        let to = to.iter().map(|name| self.id_of(name)).collect();
        self.references.push((from, to));
        self
    }

    fn id_of(&mut self, name: &str) -> usize {
        if let Some(index) = self.files.iter().position(|f| f == name) {
            return index + 1;
        }
        self.files.push(name.to_string());
        self.files.len()
    }

    /// Render the artifact document.
    pub fn build(&self) -> Value {
        let referenced_map: Vec<Value> = self
            .references
            .iter()
            .enumerate()
            .map(|(list_index, (file_id, _))| json!([file_id, list_index + 1]))
            .collect();
        let file_ids_list: Vec<Value> = self.references.iter().map(|(_, ids)| json!(ids)).collect();

        json!({
            "program": {
                "fileNames": self.files,
                "referencedMap": referenced_map,
                "fileIdsList": file_ids_list
            },
            "version": "5.4.5"
        })
    }
}
