//! Project-reference config (`tsconfig.json`) view
//!
//! Like [`Manifest`](super::Manifest), the config is kept as raw JSON and
//! only the fields wsync manages are touched: `references`,
//! `compilerOptions.paths` and the canonical settings.

use serde_json::{Map, Value, json};
use wsync_fs::{NormalizedPath, WorkspaceFile};

use super::manifest::json_kind;
use crate::{Error, Result};

/// Canonical compiler settings every workspace config carries.
pub fn workspace_settings() -> [(&'static str, Value); 3] {
    [
        ("composite", Value::Bool(true)),
        ("outDir", Value::String(WorkspaceFile::OutDir.as_str().to_string())),
        (
            "tsBuildInfoFile",
            Value::String(WorkspaceFile::BuildInfo.as_str().to_string()),
        ),
    ]
}

/// A parsed `tsconfig.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    value: Map<String, Value>,
}

impl ProjectConfig {
    /// Wrap a parsed document; anything but a JSON object is rejected.
    pub fn from_value(path: &NormalizedPath, value: Value) -> Result<Self> {
        match value {
            Value::Object(value) => Ok(Self { value }),
            other => Err(Error::InvalidDocument {
                path: path.to_native(),
                message: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    /// Load a config from disk, `None` when the file does not exist.
    pub fn load(path: &NormalizedPath) -> Result<Option<Self>> {
        match wsync_fs::io::read_json_if_exists(path)? {
            Some(value) => Self::from_value(path, value).map(Some),
            None => Ok(None),
        }
    }

    /// Default document for a workspace: the canonical settings and nothing else.
    pub fn workspace_template() -> Self {
        let options: Map<String, Value> = workspace_settings()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        let mut value = Map::new();
        value.insert("compilerOptions".to_string(), Value::Object(options));
        Self { value }
    }

    /// Default document for the project root: a solution-style config.
    pub fn root_template() -> Self {
        let mut value = Map::new();
        value.insert("files".to_string(), json!([]));
        value.insert("references".to_string(), json!([]));
        Self { value }
    }

    /// Reference paths in document order. Entries without a string `path` are skipped.
    pub fn references(&self) -> Vec<String> {
        self.value
            .get("references")
            .and_then(Value::as_array)
            .map(|refs| {
                refs.iter()
                    .filter_map(|r| r.get("path").and_then(Value::as_str))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_references_field(&self) -> bool {
        self.value.contains_key("references")
    }

    /// Replace the reference list with `{ "path": ... }` entries.
    pub fn set_references(&mut self, paths: &[String]) {
        let refs = paths.iter().map(|path| json!({ "path": path })).collect();
        self.value.insert("references".to_string(), Value::Array(refs));
    }

    fn compiler_options(&self) -> Option<&Map<String, Value>> {
        self.value.get("compilerOptions").and_then(Value::as_object)
    }

    fn compiler_options_mut(&mut self) -> &mut Map<String, Value> {
        let entry = self
            .value
            .entry("compilerOptions")
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(options) => options,
            _ => unreachable!("compilerOptions was just made an object"),
        }
    }

    /// The alias table at `compilerOptions.paths`.
    pub fn aliases(&self) -> Option<&Map<String, Value>> {
        self.compiler_options()
            .and_then(|options| options.get("paths"))
            .and_then(Value::as_object)
    }

    pub fn alias(&self, key: &str) -> Option<&Value> {
        self.aliases().and_then(|paths| paths.get(key))
    }

    /// Set `key` to resolve to `[target]`. Returns whether anything changed.
    pub fn set_alias(&mut self, key: &str, target: &str) -> bool {
        let wanted = json!([target]);
        if self.alias(key) == Some(&wanted) {
            return false;
        }
        let options = self.compiler_options_mut();
        let paths = options
            .entry("paths")
            .or_insert_with(|| Value::Object(Map::new()));
        if !paths.is_object() {
            *paths = Value::Object(Map::new());
        }
        if let Value::Object(paths) = paths {
            paths.insert(key.to_string(), wanted);
        }
        true
    }

    /// Remove every alias resolving into `dir` (exactly or through `dir/*`)
    /// whose key is not in `keep`. Returns the removed keys.
    pub fn remove_aliases_into(&mut self, dir: &NormalizedPath, keep: &[String]) -> Vec<String> {
        let Some(paths) = self
            .value
            .get_mut("compilerOptions")
            .and_then(Value::as_object_mut)
            .and_then(|options| options.get_mut("paths"))
            .and_then(Value::as_object_mut)
        else {
            return Vec::new();
        };

        let stale: Vec<String> = paths
            .iter()
            .filter(|(key, targets)| !keep.contains(*key) && resolves_into(targets, dir))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            paths.shift_remove(key);
        }
        stale
    }

    /// True when every canonical workspace setting has its canonical value.
    pub fn has_workspace_settings(&self) -> bool {
        let options = self.compiler_options();
        workspace_settings()
            .iter()
            .all(|(key, value)| options.and_then(|o| o.get(*key)) == Some(value))
    }

    /// Force the canonical workspace settings. Returns the keys that changed.
    pub fn apply_workspace_settings(&mut self) -> Vec<String> {
        let options = self.compiler_options_mut();
        let mut changed = Vec::new();
        for (key, value) in workspace_settings() {
            if options.get(key) != Some(&value) {
                options.insert(key.to_string(), value);
                changed.push(key.to_string());
            }
        }
        changed
    }

    /// True when the root is a solution-style config: empty `files`, no
    /// `include` or `exclude`.
    pub fn has_root_settings(&self) -> bool {
        self.value.get("files") == Some(&json!([]))
            && !self.value.contains_key("include")
            && !self.value.contains_key("exclude")
    }

    /// Force the canonical root settings. Returns the keys that changed.
    pub fn apply_root_settings(&mut self) -> Vec<String> {
        let mut changed = Vec::new();
        if self.value.get("files") != Some(&json!([])) {
            self.value.insert("files".to_string(), json!([]));
            changed.push("files".to_string());
        }
        for key in ["include", "exclude"] {
            if self.value.shift_remove(key).is_some() {
                changed.push(key.to_string());
            }
        }
        changed
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.value.clone())
    }
}

fn resolves_into(targets: &Value, dir: &NormalizedPath) -> bool {
    targets.as_array().is_some_and(|targets| {
        targets.iter().filter_map(Value::as_str).any(|target| {
            let target = target.strip_suffix("/*").unwrap_or(target);
            NormalizedPath::new(target) == *dir
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(value: Value) -> ProjectConfig {
        ProjectConfig::from_value(&NormalizedPath::new("tsconfig.json"), value).unwrap()
    }

    #[test]
    fn test_workspace_template_is_satisfactory() {
        let template = ProjectConfig::workspace_template();
        assert!(template.has_workspace_settings());
        assert_eq!(
            template.to_value(),
            json!({
                "compilerOptions": {
                    "composite": true,
                    "outDir": ".ts",
                    "tsBuildInfoFile": ".ts/tsconfig.tsbuildinfo"
                }
            })
        );
    }

    #[test]
    fn test_root_template_is_satisfactory() {
        assert!(ProjectConfig::root_template().has_root_settings());
    }

    #[test]
    fn test_references_skip_malformed_entries() {
        let c = config(json!({ "references": [{ "path": "../a" }, { "prepend": true }, "x"] }));
        assert_eq!(c.references(), vec!["../a".to_string()]);
    }

    #[test]
    fn test_set_alias_creates_tables() {
        let mut c = config(json!({}));
        assert!(c.set_alias("a", "../a"));
        assert!(!c.set_alias("a", "../a"));
        assert_eq!(c.to_value(), json!({ "compilerOptions": { "paths": { "a": ["../a"] } } }));
    }

    #[test]
    fn test_remove_aliases_into_honours_keep_list() {
        let mut c = config(json!({
            "compilerOptions": {
                "paths": {
                    "old": ["../a"],
                    "old/*": ["../a/*"],
                    "new": ["../a"],
                    "other": ["../b"]
                }
            }
        }));
        let removed = c.remove_aliases_into(&NormalizedPath::new("../a"), &["new".to_string()]);
        assert_eq!(removed, vec!["old".to_string(), "old/*".to_string()]);
        assert_eq!(
            c.aliases().unwrap().keys().cloned().collect::<Vec<_>>(),
            vec!["new".to_string(), "other".to_string()]
        );
    }

    #[test]
    fn test_apply_workspace_settings_keeps_unrelated_options() {
        let mut c = config(json!({ "compilerOptions": { "strict": true, "outDir": "dist" } }));
        assert!(!c.has_workspace_settings());
        let changed = c.apply_workspace_settings();
        assert_eq!(
            changed,
            vec!["composite".to_string(), "outDir".to_string(), "tsBuildInfoFile".to_string()]
        );
        assert!(c.has_workspace_settings());
        assert_eq!(c.to_value()["compilerOptions"]["strict"], json!(true));
    }

    #[test]
    fn test_apply_root_settings_drops_include_and_exclude() {
        let mut c = config(json!({ "include": ["src"], "exclude": ["dist"], "files": ["a.ts"] }));
        let changed = c.apply_root_settings();
        assert_eq!(
            changed,
            vec!["files".to_string(), "include".to_string(), "exclude".to_string()]
        );
        assert!(c.has_root_settings());
    }
}
