//! Pure planning of document rewrites
//!
//! Every function here takes the current document and the wanted state and
//! returns a [`Patch`] when (and only when) the document has to change.
//! Nothing in this module touches the filesystem.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;
use wsync_fs::NormalizedPath;

use crate::document::{Manifest, ProjectConfig};

/// Declared versus discovered workspace dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyDiff {
    /// Discovered but not declared
    pub missing: BTreeSet<String>,
    /// Declared but not discovered
    pub redundant: BTreeSet<String>,
}

impl DependencyDiff {
    pub fn between(declared: &BTreeSet<String>, discovered: &BTreeSet<String>) -> Self {
        Self {
            missing: discovered.difference(declared).cloned().collect(),
            redundant: declared.difference(discovered).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.redundant.is_empty()
    }
}

/// One edit within a [`Patch`], used for change notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    AddReference(String),
    RemoveReference(String),
    AddAlias(String),
    RemoveAlias(String),
    AddDependency(String),
    RemoveDependency(String),
    RenameDependency { from: String, to: String },
    Setting(String),
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddReference(path) => write!(f, "add reference {path}"),
            Self::RemoveReference(path) => write!(f, "remove reference {path}"),
            Self::AddAlias(key) => write!(f, "add alias {key}"),
            Self::RemoveAlias(key) => write!(f, "remove alias {key}"),
            Self::AddDependency(name) => write!(f, "add dependency {name}"),
            Self::RemoveDependency(name) => write!(f, "remove dependency {name}"),
            Self::RenameDependency { from, to } => write!(f, "rename dependency {from} -> {to}"),
            Self::Setting(key) => write!(f, "set {key}"),
        }
    }
}

/// A computed rewrite of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Absolute path of the document
    pub path: NormalizedPath,
    /// Current content, `None` when the file does not exist yet
    pub before: Option<Value>,
    pub after: Value,
    pub changes: Vec<Change>,
}

impl Patch {
    /// A patch from `before` to `after`, or `None` when they are equal.
    pub fn between(
        path: NormalizedPath,
        before: Option<Value>,
        after: Value,
        changes: Vec<Change>,
    ) -> Option<Self> {
        if before.as_ref() == Some(&after) {
            return None;
        }
        Some(Self {
            path,
            before,
            after,
            changes,
        })
    }

    pub fn creates_file(&self) -> bool {
        self.before.is_none()
    }
}

/// A reference a workspace config should carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTarget {
    /// Dependency name, used as the alias key
    pub name: String,
    /// Directory of the dependency relative to the referencing config
    pub path: String,
}

impl ReferenceTarget {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

fn same_dir(a: &str, b: &str) -> bool {
    NormalizedPath::new(a) == NormalizedPath::new(b)
}

/// Existing references that stay, in document order, followed by the new
/// ones in sorted order.
fn merge_references(current: &[String], wanted: &[String]) -> (Vec<String>, Vec<Change>) {
    let mut changes = Vec::new();
    let mut merged: Vec<String> = Vec::new();

    for existing in current {
        let kept = wanted.iter().any(|w| same_dir(w, existing));
        let duplicate = merged.iter().any(|m| same_dir(m, existing));
        if kept && !duplicate {
            merged.push(existing.clone());
        } else if !kept {
            changes.push(Change::RemoveReference(existing.clone()));
        }
    }

    let mut added: Vec<String> = wanted
        .iter()
        .filter(|w| !merged.iter().any(|m| same_dir(m, w)))
        .cloned()
        .collect();
    added.sort();
    added.dedup();
    changes.extend(added.iter().cloned().map(Change::AddReference));
    merged.extend(added);

    (merged, changes)
}

fn write_references(config: &mut ProjectConfig, current: &[String], merged: Vec<String>) {
    if merged.as_slice() == current && (config.has_references_field() || merged.is_empty()) {
        return;
    }
    config.set_references(&merged);
}

/// Plan the references and path aliases of a workspace config.
///
/// References not in `targets` lose their reference and every alias into
/// their directory. Each target gets a reference plus `name` and `name/*`
/// aliases; aliases into a target directory under any other key are
/// dropped, which repairs keys left behind by a rename. A missing config
/// (`current == None`) starts from the workspace template.
pub fn reference_patch(
    path: NormalizedPath,
    current: Option<&ProjectConfig>,
    targets: &[ReferenceTarget],
) -> Option<Patch> {
    let mut config = current.cloned().unwrap_or_else(ProjectConfig::workspace_template);
    let existing = config.references();
    let wanted: Vec<String> = targets.iter().map(|t| t.path.clone()).collect();
    let (merged, mut changes) = merge_references(&existing, &wanted);

    for redundant in existing.iter().filter(|e| !wanted.iter().any(|w| same_dir(w, e))) {
        for key in config.remove_aliases_into(&NormalizedPath::new(redundant), &[]) {
            changes.push(Change::RemoveAlias(key));
        }
    }

    for target in targets {
        let wildcard_key = format!("{}/*", target.name);
        let keep = [target.name.clone(), wildcard_key.clone()];
        for key in config.remove_aliases_into(&NormalizedPath::new(&target.path), &keep) {
            changes.push(Change::RemoveAlias(key));
        }
        if config.set_alias(&target.name, &target.path) {
            changes.push(Change::AddAlias(target.name.clone()));
        }
        if config.set_alias(&wildcard_key, &format!("{}/*", target.path)) {
            changes.push(Change::AddAlias(wildcard_key));
        }
    }

    write_references(&mut config, &existing, merged);
    Patch::between(path, current.map(ProjectConfig::to_value), config.to_value(), changes)
}

/// Plan the root config: solution-style settings and one reference per
/// entry of `workspaces` (root-relative).
pub fn root_reference_patch(
    path: NormalizedPath,
    current: Option<&ProjectConfig>,
    workspaces: &BTreeSet<NormalizedPath>,
) -> Option<Patch> {
    let mut config = current.cloned().unwrap_or_else(ProjectConfig::root_template);
    let mut changes: Vec<Change> = config
        .apply_root_settings()
        .into_iter()
        .map(Change::Setting)
        .collect();

    let existing = config.references();
    let wanted: Vec<String> = workspaces.iter().map(|ws| ws.as_str().to_string()).collect();
    let (merged, reference_changes) = merge_references(&existing, &wanted);
    changes.extend(reference_changes);

    write_references(&mut config, &existing, merged);
    Patch::between(path, current.map(ProjectConfig::to_value), config.to_value(), changes)
}

/// Plan forcing the canonical workspace compiler settings.
pub fn settings_patch(path: NormalizedPath, current: Option<&ProjectConfig>) -> Option<Patch> {
    let mut config = current.cloned().unwrap_or_else(ProjectConfig::workspace_template);
    let changes = config
        .apply_workspace_settings()
        .into_iter()
        .map(|key| Change::Setting(format!("compilerOptions.{key}")))
        .collect();
    Patch::between(path, current.map(ProjectConfig::to_value), config.to_value(), changes)
}

/// Plan adding `missing` and removing `redundant` manifest dependencies.
/// Dependency maps are emitted in sorted key order.
pub fn dependency_patch(
    path: NormalizedPath,
    current: &Manifest,
    missing: &BTreeSet<String>,
    redundant: &BTreeSet<String>,
) -> Option<Patch> {
    let mut manifest = current.clone();
    let mut changes = Vec::new();
    for name in missing {
        if manifest.add_dependency(name) {
            changes.push(Change::AddDependency(name.clone()));
        }
    }
    for name in redundant {
        if manifest.remove_dependency(name) {
            changes.push(Change::RemoveDependency(name.clone()));
        }
    }
    manifest.sort_dependencies();
    Patch::between(path, Some(current.to_value()), manifest.to_value(), changes)
}

/// Plan re-keying dependency `old` to `new`, keeping its version spec.
pub fn rename_patch(
    path: NormalizedPath,
    current: &Manifest,
    old: &str,
    new: &str,
) -> Option<Patch> {
    let mut manifest = current.clone();
    if !manifest.rename_dependency(old, new) {
        return None;
    }
    manifest.sort_dependencies();
    let changes = vec![Change::RenameDependency {
        from: old.to_string(),
        to: new.to_string(),
    }];
    Patch::between(path, Some(current.to_value()), manifest.to_value(), changes)
}
