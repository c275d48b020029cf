//! Package manifest (`package.json`) view
//!
//! The manifest is kept as raw JSON so that keys wsync does not manage
//! survive every rewrite untouched.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use wsync_fs::NormalizedPath;

use crate::{Error, Result};

/// Version spec used for dependencies wsync adds.
pub const WILDCARD_VERSION: &str = "*";

/// The two manifest fields that declare dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyField {
    Dependencies,
    DevDependencies,
}

impl DependencyField {
    pub const ALL: [DependencyField; 2] = [Self::Dependencies, Self::DevDependencies];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::DevDependencies => "devDependencies",
        }
    }
}

/// A parsed `package.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    value: Map<String, Value>,
}

impl Manifest {
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

    /// Load a manifest from disk, `None` when the file does not exist.
    pub fn load(path: &NormalizedPath) -> Result<Option<Self>> {
        match wsync_fs::io::read_json_if_exists(path)? {
            Some(value) => Self::from_value(path, value).map(Some),
            None => Ok(None),
        }
    }

    /// Declared package name; empty strings count as absent.
    pub fn name(&self) -> Option<&str> {
        self.value
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Workspace globs, in either the array form or the `{ "packages": [...] }` form.
    pub fn workspaces(&self) -> Vec<String> {
        let list = match self.value.get("workspaces") {
            Some(Value::Array(list)) => list,
            Some(Value::Object(obj)) => match obj.get("packages") {
                Some(Value::Array(list)) => list,
                _ => return Vec::new(),
            },
            _ => return Vec::new(),
        };
        list.iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect()
    }

    fn field(&self, field: DependencyField) -> Option<&Map<String, Value>> {
        self.value.get(field.as_str()).and_then(Value::as_object)
    }

    /// Names declared in `dependencies` and `devDependencies`.
    pub fn dependency_names(&self) -> BTreeSet<String> {
        DependencyField::ALL
            .iter()
            .filter_map(|field| self.field(*field))
            .flat_map(|deps| deps.keys().cloned())
            .collect()
    }

    /// Which field declares `name`, and with which version spec.
    pub fn dependency(&self, name: &str) -> Option<(DependencyField, &Value)> {
        DependencyField::ALL.iter().find_map(|field| {
            self.field(*field)
                .and_then(|deps| deps.get(name))
                .map(|version| (*field, version))
        })
    }

    /// Add `name` to `dependencies` with the wildcard version unless it is
    /// already declared in either field. Returns whether anything changed.
    pub fn add_dependency(&mut self, name: &str) -> bool {
        if self.dependency(name).is_some() {
            return false;
        }
        let deps = self
            .value
            .entry(DependencyField::Dependencies.as_str())
            .or_insert_with(|| Value::Object(Map::new()));
        match deps.as_object_mut() {
            Some(deps) => {
                deps.insert(name.to_string(), Value::String(WILDCARD_VERSION.to_string()));
                true
            }
            None => false,
        }
    }

    /// Remove `name` from both dependency fields. Returns whether anything changed.
    pub fn remove_dependency(&mut self, name: &str) -> bool {
        let mut removed = false;
        for field in DependencyField::ALL {
            if let Some(deps) = self
                .value
                .get_mut(field.as_str())
                .and_then(Value::as_object_mut)
            {
                removed |= deps.shift_remove(name).is_some();
            }
        }
        removed
    }

    /// Re-key `old` to `new` in whichever fields declare it, keeping the version.
    pub fn rename_dependency(&mut self, old: &str, new: &str) -> bool {
        let mut renamed = false;
        for field in DependencyField::ALL {
            if let Some(deps) = self
                .value
                .get_mut(field.as_str())
                .and_then(Value::as_object_mut)
                && let Some(version) = deps.shift_remove(old)
            {
                deps.insert(new.to_string(), version);
                renamed = true;
            }
        }
        renamed
    }

    /// Put both dependency maps in sorted key order.
    pub fn sort_dependencies(&mut self) {
        for field in DependencyField::ALL {
            if let Some(Value::Object(deps)) = self.value.get_mut(field.as_str()) {
                let mut entries: Vec<(String, Value)> = std::mem::take(deps).into_iter().collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                deps.extend(entries);
            }
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.value.clone())
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn manifest(value: Value) -> Manifest {
        Manifest::from_value(&NormalizedPath::new("package.json"), value).unwrap()
    }

    #[test]
    fn test_rejects_non_objects() {
        let result = Manifest::from_value(&NormalizedPath::new("package.json"), json!([1, 2]));
        assert!(matches!(result, Err(Error::InvalidDocument { .. })));
    }

    #[test]
    fn test_empty_name_is_absent() {
        assert_eq!(manifest(json!({ "name": "" })).name(), None);
        assert_eq!(manifest(json!({ "name": 3 })).name(), None);
        assert_eq!(manifest(json!({ "name": "a" })).name(), Some("a"));
    }

    #[test]
    fn test_workspaces_in_both_forms() {
        let array = manifest(json!({ "workspaces": ["packages/*", 3] }));
        assert_eq!(array.workspaces(), vec!["packages/*".to_string()]);

        let object = manifest(json!({ "workspaces": { "packages": ["libs/*"] } }));
        assert_eq!(object.workspaces(), vec!["libs/*".to_string()]);
    }

    #[test]
    fn test_dependency_names_cover_both_fields() {
        let m = manifest(json!({
            "dependencies": { "a": "*" },
            "devDependencies": { "b": "^1.0.0" }
        }));
        let names: Vec<_> = m.dependency_names().into_iter().collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_add_skips_dev_declared() {
        let mut m = manifest(json!({ "devDependencies": { "a": "1.0.0" } }));
        assert!(!m.add_dependency("a"));
        assert!(m.add_dependency("b"));
        assert_eq!(
            m.to_value(),
            json!({ "devDependencies": { "a": "1.0.0" }, "dependencies": { "b": "*" } })
        );
    }

    #[test]
    fn test_remove_clears_both_fields() {
        let mut m = manifest(json!({
            "dependencies": { "a": "*" },
            "devDependencies": { "a": "*" }
        }));
        assert!(m.remove_dependency("a"));
        assert!(m.dependency_names().is_empty());
        assert!(!m.remove_dependency("a"));
    }

    #[test]
    fn test_rename_keeps_version_and_field() {
        let mut m = manifest(json!({ "devDependencies": { "old": "workspace:^" } }));
        assert!(m.rename_dependency("old", "new"));
        assert_eq!(
            m.dependency("new").map(|(f, v)| (f, v.clone())),
            Some((DependencyField::DevDependencies, json!("workspace:^")))
        );
    }

    #[test]
    fn test_sorting_orders_keys_and_keeps_other_fields() {
        let mut m = manifest(json!({
            "name": "a",
            "dependencies": { "zeta": "*", "alpha": "*" },
            "scripts": { "build": "tsc" }
        }));
        m.sort_dependencies();
        let value = m.to_value();
        let keys: Vec<_> = value["dependencies"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["alpha".to_string(), "zeta".to_string()]);
        assert_eq!(value["scripts"], json!({ "build": "tsc" }));
    }
}
