//! In-memory registry of watched workspaces
//!
//! The registry is the single source of truth for which workspace
//! directories are watched, which name each one declares, which
//! dependencies it declares and whether it is ready for synchronization.
//! It is plain data: every mutator preserves the name/path bijection and
//! never touches the filesystem.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use bitflags::bitflags;
use wsync_fs::NormalizedPath;

use crate::{Error, Result};

bitflags! {
    /// Readiness requirements of a workspace. A workspace takes part in
    /// synchronization only when all of them are met.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Readiness: u8 {
        /// `package.json` exists
        const HAS_MANIFEST = 1 << 0;
        /// `package.json` parsed and declares a name
        const HAS_NAME = 1 << 1;
        /// `tsconfig.json` exists
        const HAS_BUILD_CONFIG = 1 << 2;
    }
}

/// Watch state of a workspace's build artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// Watched, not produced yet
    Absent,
    /// Watched and present on disk
    Present,
    /// Watched, was present and has been deleted; synchronization is paused
    Missing,
}

#[derive(Debug, Clone)]
struct WorkspaceEntry {
    readiness: Readiness,
    name: Option<String>,
    /// Name held before `clear_name`, until the workspace is named again
    last_name: Option<String>,
    dependencies: BTreeSet<String>,
    artifact: Option<ArtifactState>,
}

impl WorkspaceEntry {
    fn new() -> Self {
        Self {
            readiness: Readiness::empty(),
            name: None,
            last_name: None,
            dependencies: BTreeSet::new(),
            artifact: None,
        }
    }
}

/// Registry of workspaces keyed by their root-relative directory.
#[derive(Debug, Default)]
pub struct WorkspaceRegistry {
    workspaces: BTreeMap<NormalizedPath, WorkspaceEntry>,
    paths_by_name: HashMap<String, NormalizedPath>,
}

impl WorkspaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start watching a workspace directory. Returns false if it was already watched.
    pub fn watch(&mut self, path: NormalizedPath) -> bool {
        if self.workspaces.contains_key(&path) {
            return false;
        }
        self.workspaces.insert(path, WorkspaceEntry::new());
        true
    }

    /// Stop watching a workspace and forget its name. Returns the name it had.
    pub fn unwatch(&mut self, path: &NormalizedPath) -> Option<String> {
        let entry = self.workspaces.remove(path)?;
        if let Some(name) = &entry.name {
            self.paths_by_name.remove(name);
        }
        entry.name
    }

    /// Forget every workspace.
    pub fn clear(&mut self) {
        self.workspaces.clear();
        self.paths_by_name.clear();
    }

    pub fn is_watched(&self, path: &NormalizedPath) -> bool {
        self.workspaces.contains_key(path)
    }

    /// Every watched workspace directory.
    pub fn watched_paths(&self) -> BTreeSet<NormalizedPath> {
        self.workspaces.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }

    /// Set a readiness bit. Returns false when the workspace is not watched.
    pub fn add_requirement(&mut self, path: &NormalizedPath, bit: Readiness) -> bool {
        match self.workspaces.get_mut(path) {
            Some(entry) => {
                entry.readiness.insert(bit);
                true
            }
            None => false,
        }
    }

    /// Clear a readiness bit. Returns false when the workspace is not watched.
    pub fn remove_requirement(&mut self, path: &NormalizedPath, bit: Readiness) -> bool {
        match self.workspaces.get_mut(path) {
            Some(entry) => {
                entry.readiness.remove(bit);
                true
            }
            None => false,
        }
    }

    pub fn has_requirement(&self, path: &NormalizedPath, bit: Readiness) -> bool {
        self.readiness(path).contains(bit)
    }

    pub fn has_all_requirements(&self, path: &NormalizedPath) -> bool {
        self.readiness(path).is_all()
    }

    /// Current readiness; empty for unwatched paths.
    pub fn readiness(&self, path: &NormalizedPath) -> Readiness {
        self.workspaces
            .get(path)
            .map(|entry| entry.readiness)
            .unwrap_or(Readiness::empty())
    }

    /// Bind `name` to `path`, replacing the path's previous name in one step.
    ///
    /// A different path that held `name` loses it (and its `HAS_NAME` bit);
    /// that path is returned so callers can report the clash.
    pub fn set_name(
        &mut self,
        path: &NormalizedPath,
        name: &str,
    ) -> Result<Option<NormalizedPath>> {
        if !self.workspaces.contains_key(path) {
            return Err(Error::invariant(format!(
                "cannot name unwatched workspace {path}"
            )));
        }

        let mut displaced = None;
        if let Some(holder) = self.paths_by_name.get(name).cloned()
            && holder != *path
        {
            if let Some(entry) = self.workspaces.get_mut(&holder) {
                entry.name = None;
                entry.readiness.remove(Readiness::HAS_NAME);
            }
            displaced = Some(holder);
        }

        if let Some(entry) = self.workspaces.get_mut(path) {
            entry.last_name = None;
            if let Some(old) = entry.name.replace(name.to_string()) {
                self.paths_by_name.remove(&old);
            }
        }
        self.paths_by_name.insert(name.to_string(), path.clone());
        Ok(displaced)
    }

    /// Remove the name bound to `path`. Returns the name it had.
    ///
    /// The name is remembered as [`last_name`](Self::last_name) so a later
    /// rename can still be told apart from a new workspace.
    pub fn clear_name(&mut self, path: &NormalizedPath) -> Option<String> {
        let entry = self.workspaces.get_mut(path)?;
        let name = entry.name.take()?;
        entry.last_name = Some(name.clone());
        self.paths_by_name.remove(&name);
        Some(name)
    }

    /// Name `path` held before it was last cleared, if it has not been
    /// named since.
    pub fn last_name(&self, path: &NormalizedPath) -> Option<&str> {
        self.workspaces.get(path)?.last_name.as_deref()
    }

    /// Name of a registered workspace.
    ///
    /// # Errors
    ///
    /// [`Error::RegistryInvariant`] when the path has no name.
    pub fn name(&self, path: &NormalizedPath) -> Result<&str> {
        self.try_name(path)
            .ok_or_else(|| Error::invariant(format!("no name registered for workspace {path}")))
    }

    pub fn try_name(&self, path: &NormalizedPath) -> Option<&str> {
        self.workspaces.get(path)?.name.as_deref()
    }

    /// Directory of a registered workspace name.
    ///
    /// # Errors
    ///
    /// [`Error::RegistryInvariant`] when no workspace declares the name.
    pub fn path(&self, name: &str) -> Result<&NormalizedPath> {
        self.try_path(name)
            .ok_or_else(|| Error::invariant(format!("no workspace registered with name {name}")))
    }

    pub fn try_path(&self, name: &str) -> Option<&NormalizedPath> {
        self.paths_by_name.get(name)
    }

    /// True when `name` is the declared name of some watched workspace.
    pub fn is_workspace_name(&self, name: &str) -> bool {
        self.paths_by_name.contains_key(name)
    }

    /// Record the dependencies declared by the workspace named `name`.
    pub fn set_dependencies(&mut self, name: &str, dependencies: BTreeSet<String>) -> Result<()> {
        let path = self.path(name)?.clone();
        match self.workspaces.get_mut(&path) {
            Some(entry) => {
                entry.dependencies = dependencies;
                Ok(())
            }
            None => Err(Error::invariant(format!(
                "name {name} points at unwatched workspace {path}"
            ))),
        }
    }

    /// Dependencies last recorded for the workspace named `name`.
    pub fn dependencies(&self, name: &str) -> Result<&BTreeSet<String>> {
        let path = self.path(name)?;
        self.workspaces
            .get(path)
            .map(|entry| &entry.dependencies)
            .ok_or_else(|| {
                Error::invariant(format!("name {name} points at unwatched workspace {path}"))
            })
    }

    /// Declared dependencies that are themselves watched workspace names.
    pub fn workspace_dependencies(&self, name: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .dependencies(name)?
            .iter()
            .filter(|dep| self.is_workspace_name(dep))
            .cloned()
            .collect())
    }

    /// The candidates that meet every readiness requirement.
    pub fn matching_workspaces<'a>(
        &self,
        candidates: impl IntoIterator<Item = &'a NormalizedPath>,
    ) -> BTreeSet<NormalizedPath> {
        candidates
            .into_iter()
            .filter(|path| self.has_all_requirements(path))
            .cloned()
            .collect()
    }

    /// Every watched workspace that meets every readiness requirement.
    pub fn all_matching(&self) -> BTreeSet<NormalizedPath> {
        self.matching_workspaces(self.workspaces.keys())
    }

    /// The watched workspace containing `path`; the deepest one wins for nested workspaces.
    pub fn owner_of(&self, path: &NormalizedPath) -> Option<&NormalizedPath> {
        self.workspaces
            .keys()
            .filter(|workspace| path.starts_with(workspace))
            .max_by_key(|workspace| workspace.components().count())
    }

    /// Named workspaces whose recorded dependencies include `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<(NormalizedPath, String)> {
        self.workspaces
            .iter()
            .filter(|(_, entry)| entry.dependencies.contains(name))
            .filter_map(|(path, entry)| entry.name.clone().map(|n| (path.clone(), n)))
            .filter(|(_, dependent)| dependent != name)
            .collect()
    }

    pub fn artifact_state(&self, path: &NormalizedPath) -> Option<ArtifactState> {
        self.workspaces.get(path)?.artifact
    }

    /// Set (or with `None`, stop) the artifact watch of a workspace. Returns the previous state.
    pub fn set_artifact_state(
        &mut self,
        path: &NormalizedPath,
        state: Option<ArtifactState>,
    ) -> Option<ArtifactState> {
        let entry = self.workspaces.get_mut(path)?;
        std::mem::replace(&mut entry.artifact, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path(p: &str) -> NormalizedPath {
        NormalizedPath::new(p)
    }

    fn registry_with(paths: &[&str]) -> WorkspaceRegistry {
        let mut registry = WorkspaceRegistry::new();
        for p in paths {
            registry.watch(path(p));
        }
        registry
    }

    #[test]
    fn test_requirements_accumulate_to_matching() {
        let mut registry = registry_with(&["packages/a"]);
        let a = path("packages/a");

        registry.add_requirement(&a, Readiness::HAS_MANIFEST);
        registry.add_requirement(&a, Readiness::HAS_NAME);
        assert!(!registry.has_all_requirements(&a));

        registry.add_requirement(&a, Readiness::HAS_BUILD_CONFIG);
        assert!(registry.has_all_requirements(&a));

        registry.remove_requirement(&a, Readiness::HAS_NAME);
        assert!(!registry.has_all_requirements(&a));
        assert!(registry.has_requirement(&a, Readiness::HAS_BUILD_CONFIG));
    }

    #[test]
    fn test_requirements_on_unwatched_paths_are_rejected() {
        let mut registry = WorkspaceRegistry::new();
        assert!(!registry.add_requirement(&path("x"), Readiness::HAS_MANIFEST));
        assert_eq!(registry.readiness(&path("x")), Readiness::empty());
    }

    #[test]
    fn test_rename_is_an_atomic_swap() {
        let mut registry = registry_with(&["packages/a"]);
        let a = path("packages/a");
        registry.set_name(&a, "a").unwrap();
        registry.set_name(&a, "a2").unwrap();

        assert_eq!(registry.try_path("a"), None);
        assert_eq!(registry.path("a2").unwrap(), &a);
        assert_eq!(registry.name(&a).unwrap(), "a2");
    }

    #[test]
    fn test_duplicate_name_displaces_previous_holder() {
        let mut registry = registry_with(&["packages/a", "packages/b"]);
        let (a, b) = (path("packages/a"), path("packages/b"));
        registry.set_name(&a, "x").unwrap();
        registry.add_requirement(&a, Readiness::HAS_NAME);

        let displaced = registry.set_name(&b, "x").unwrap();

        assert_eq!(displaced, Some(a.clone()));
        assert_eq!(registry.try_name(&a), None);
        assert!(!registry.has_requirement(&a, Readiness::HAS_NAME));
        assert_eq!(registry.path("x").unwrap(), &b);
    }

    #[test]
    fn test_lookups_on_absent_keys_are_invariant_violations() {
        let registry = registry_with(&["packages/a"]);
        assert!(registry.name(&path("packages/a")).unwrap_err().is_fatal());
        assert!(registry.path("nope").unwrap_err().is_fatal());
        assert!(registry.dependencies("nope").unwrap_err().is_fatal());
    }

    #[test]
    fn test_naming_unwatched_workspace_fails() {
        let mut registry = WorkspaceRegistry::new();
        assert!(registry.set_name(&path("packages/a"), "a").is_err());
    }

    #[test]
    fn test_unwatch_releases_name() {
        let mut registry = registry_with(&["packages/a"]);
        registry.set_name(&path("packages/a"), "a").unwrap();

        assert_eq!(registry.unwatch(&path("packages/a")), Some("a".to_string()));
        assert!(!registry.is_workspace_name("a"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_cleared_name_is_remembered_until_renamed() {
        let mut registry = registry_with(&["packages/a"]);
        let a = path("packages/a");
        registry.set_name(&a, "a").unwrap();
        assert_eq!(registry.last_name(&a), None);

        assert_eq!(registry.clear_name(&a), Some("a".to_string()));
        assert!(!registry.is_workspace_name("a"));
        assert_eq!(registry.last_name(&a), Some("a"));

        registry.set_name(&a, "a2").unwrap();
        assert_eq!(registry.last_name(&a), None);
    }

    #[test]
    fn test_owner_prefers_deepest_workspace() {
        let registry = registry_with(&["packages/a", "packages/a/nested", "packages/ab"]);
        assert_eq!(
            registry.owner_of(&path("packages/a/nested/src/x.ts")),
            Some(&path("packages/a/nested"))
        );
        assert_eq!(
            registry.owner_of(&path("packages/ab/src/x.ts")),
            Some(&path("packages/ab"))
        );
        assert_eq!(registry.owner_of(&path("tools/x.ts")), None);
    }

    #[test]
    fn test_dependencies_round_trip_through_names() {
        let mut registry = registry_with(&["packages/a", "packages/b"]);
        registry.set_name(&path("packages/a"), "a").unwrap();
        registry.set_name(&path("packages/b"), "b").unwrap();

        let deps: BTreeSet<String> = ["a", "lodash"].iter().map(|s| s.to_string()).collect();
        registry.set_dependencies("b", deps).unwrap();

        let workspace_deps: Vec<_> = registry
            .workspace_dependencies("b")
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(workspace_deps, vec!["a".to_string()]);
        assert_eq!(
            registry.dependents_of("a"),
            vec![(path("packages/b"), "b".to_string())]
        );
    }

    #[test]
    fn test_matching_filters_candidates() {
        let mut registry = registry_with(&["packages/a", "packages/b"]);
        registry.add_requirement(&path("packages/a"), Readiness::all());

        let matching = registry.matching_workspaces(&[path("packages/a"), path("packages/b")]);
        assert_eq!(matching.into_iter().collect::<Vec<_>>(), vec![path("packages/a")]);
    }

    #[test]
    fn test_artifact_state_tracks_previous_value() {
        let mut registry = registry_with(&["packages/a"]);
        let a = path("packages/a");
        assert_eq!(registry.set_artifact_state(&a, Some(ArtifactState::Present)), None);
        assert_eq!(
            registry.set_artifact_state(&a, Some(ArtifactState::Missing)),
            Some(ArtifactState::Present)
        );
        assert_eq!(registry.artifact_state(&a), Some(ArtifactState::Missing));
    }
}
