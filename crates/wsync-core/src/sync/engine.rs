//! ConfigSynchronizer implementation
//!
//! The synchronizer turns registry state into document rewrites. Each flow
//! has a `plan_*` half that computes a [`Patch`] from what is on disk and
//! an `update_*` half that writes it, returning whether a write happened.

use std::collections::BTreeSet;

use tracing::{debug, info};
use wsync_fs::{NormalizedPath, WorkspaceFile};

use crate::Result;
use crate::context::SyncContext;
use crate::document::{Manifest, ProjectConfig};

use super::diff::{
    DependencyDiff, Patch, ReferenceTarget, dependency_patch, reference_patch, rename_patch,
    root_reference_patch, settings_patch,
};
use super::notice;

/// Rewrites manifests and configs so they agree with the registry.
///
/// The synchronizer is synchronous and short-lived: it locks the registry
/// only inside a single method call and never across a write.
pub struct ConfigSynchronizer<'a> {
    ctx: &'a SyncContext,
}

impl<'a> ConfigSynchronizer<'a> {
    pub fn new(ctx: &'a SyncContext) -> Self {
        Self { ctx }
    }

    /// References `workspace` should carry for `dependencies`: one per
    /// dependency that names a matching workspace other than itself.
    fn reference_targets(
        &self,
        workspace: &NormalizedPath,
        dependencies: &BTreeSet<String>,
    ) -> Vec<ReferenceTarget> {
        let registry = self.ctx.registry();
        dependencies
            .iter()
            .filter_map(|name| {
                let path = registry.try_path(name)?;
                if path == workspace || !registry.has_all_requirements(path) {
                    return None;
                }
                Some(ReferenceTarget::new(name.clone(), path.relative_to(workspace).as_str()))
            })
            .collect()
    }

    fn load_config(&self, path: &NormalizedPath) -> Result<Option<ProjectConfig>> {
        ProjectConfig::load(path)
    }

    /// Plan the reference and alias rewrite of `workspace`'s config.
    pub fn plan_references(
        &self,
        workspace: &NormalizedPath,
        dependencies: &BTreeSet<String>,
    ) -> Result<Option<Patch>> {
        let path = self.ctx.workspace_file(workspace, WorkspaceFile::ProjectConfig);
        let current = self.load_config(&path)?;
        let targets = self.reference_targets(workspace, dependencies);
        Ok(reference_patch(path, current.as_ref(), &targets))
    }

    /// Make `workspace`'s references and aliases match `dependencies`.
    pub fn update_references(
        &self,
        workspace: &NormalizedPath,
        dependencies: &BTreeSet<String>,
    ) -> Result<bool> {
        let patch = self.plan_references(workspace, dependencies)?;
        self.commit(patch)
    }

    /// Plan the root config rewrite. No config is created while no
    /// workspace is matching.
    pub fn plan_root_references(&self) -> Result<Option<Patch>> {
        let path = self.ctx.root_file(WorkspaceFile::ProjectConfig);
        let current = self.load_config(&path)?;
        let matching = self.ctx.registry().all_matching();
        if current.is_none() && matching.is_empty() {
            return Ok(None);
        }
        Ok(root_reference_patch(path, current.as_ref(), &matching))
    }

    /// Make the root config reference every matching workspace.
    pub fn update_root_references(&self) -> Result<bool> {
        let patch = self.plan_root_references()?;
        self.commit(patch)
    }

    /// Plan the canonical compiler settings of `workspace`'s config.
    pub fn plan_workspace_settings(&self, workspace: &NormalizedPath) -> Result<Option<Patch>> {
        let path = self.ctx.workspace_file(workspace, WorkspaceFile::ProjectConfig);
        let current = self.load_config(&path)?;
        Ok(settings_patch(path, current.as_ref()))
    }

    /// Force the canonical compiler settings, creating the config if needed.
    pub fn update_workspace_settings(&self, workspace: &NormalizedPath) -> Result<bool> {
        let patch = self.plan_workspace_settings(workspace)?;
        self.commit(patch)
    }

    /// Plan adding `missing` and removing `redundant` from `workspace`'s
    /// manifest. `None` when nothing changes or there is no manifest.
    pub fn plan_dependencies(
        &self,
        workspace: &NormalizedPath,
        missing: &BTreeSet<String>,
        redundant: &BTreeSet<String>,
    ) -> Result<Option<Patch>> {
        let path = self.ctx.workspace_file(workspace, WorkspaceFile::Manifest);
        let Some(manifest) = Manifest::load(&path)? else {
            debug!(workspace = %workspace, "no manifest to update");
            return Ok(None);
        };
        Ok(dependency_patch(path, &manifest, missing, redundant))
    }

    /// Add `missing` as wildcard dependencies and drop `redundant` ones.
    pub fn update_dependencies(
        &self,
        workspace: &NormalizedPath,
        missing: &BTreeSet<String>,
        redundant: &BTreeSet<String>,
    ) -> Result<bool> {
        let patch = self.plan_dependencies(workspace, missing, redundant)?;
        self.commit(patch)
    }

    /// Apply `diff` to `workspace`'s manifest under the configured policy
    /// and record the resulting dependencies in the registry.
    ///
    /// Missing dependencies are always added. Redundant ones are removed
    /// only with `remove_redundant`; with `report_redundant` a removal
    /// command is suggested instead. Returns the declared dependencies
    /// after the update.
    pub fn reconcile_dependencies(
        &self,
        workspace: &NormalizedPath,
        diff: &DependencyDiff,
    ) -> Result<BTreeSet<String>> {
        let options = self.ctx.options();
        let removals = if options.remove_redundant {
            diff.redundant.clone()
        } else {
            if options.report_redundant && !diff.redundant.is_empty() {
                let names: Vec<&str> = diff.redundant.iter().map(String::as_str).collect();
                info!(
                    workspace = %workspace,
                    "unused workspace dependencies, remove with: npm uninstall --workspace {} {}",
                    workspace,
                    names.join(" ")
                );
            }
            BTreeSet::new()
        };

        self.update_dependencies(workspace, &diff.missing, &removals)?;

        let path = self.ctx.workspace_file(workspace, WorkspaceFile::Manifest);
        let declared = Manifest::load(&path)?
            .map(|manifest| manifest.dependency_names())
            .unwrap_or_default();

        let mut registry = self.ctx.registry();
        let name = registry.name(workspace)?.to_string();
        registry.set_dependencies(&name, declared.clone())?;
        Ok(declared)
    }

    /// Propagate the rename of workspace `renamed` from `old` to `new`.
    ///
    /// Every other workspace whose dependencies include `old` gets its
    /// manifest key rewritten, its registry dependencies updated and its
    /// references re-synchronized from those dependencies. The registry
    /// must already map `new` to `renamed`. Returns the workspaces touched.
    pub fn rename_references(
        &self,
        old: &str,
        new: &str,
        renamed: &NormalizedPath,
    ) -> Result<Vec<NormalizedPath>> {
        let dependents: Vec<(NormalizedPath, String)> = self
            .ctx
            .registry()
            .dependents_of(old)
            .into_iter()
            .filter(|(path, _)| path != renamed)
            .collect();

        let mut touched = Vec::new();
        for (workspace, name) in dependents {
            let path = self.ctx.workspace_file(&workspace, WorkspaceFile::Manifest);
            if let Some(manifest) = Manifest::load(&path)? {
                self.commit(rename_patch(path, &manifest, old, new))?;
            }

            let dependencies = {
                let mut registry = self.ctx.registry();
                let mut dependencies = registry.dependencies(&name)?.clone();
                dependencies.remove(old);
                dependencies.insert(new.to_string());
                registry.set_dependencies(&name, dependencies)?;
                registry.workspace_dependencies(&name)?
            };

            let matching = self.ctx.registry().has_all_requirements(&workspace);
            if matching {
                self.update_references(&workspace, &dependencies)?;
            }
            touched.push(workspace);
        }
        Ok(touched)
    }

    /// True when `workspace` has a config with canonical settings whose
    /// references and aliases already match `dependencies`.
    pub fn workspace_config_satisfied(
        &self,
        workspace: &NormalizedPath,
        dependencies: &BTreeSet<String>,
    ) -> Result<bool> {
        let path = self.ctx.workspace_file(workspace, WorkspaceFile::ProjectConfig);
        let Some(config) = self.load_config(&path)? else {
            return Ok(false);
        };
        if !config.has_workspace_settings() {
            return Ok(false);
        }
        let targets = self.reference_targets(workspace, dependencies);
        Ok(reference_patch(path, Some(&config), &targets).is_none())
    }

    /// True when the root config needs no rewrite. A project with no
    /// matching workspaces does not need a root config at all.
    pub fn root_config_satisfied(&self) -> Result<bool> {
        Ok(self.plan_root_references()?.is_none())
    }

    /// Write a planned patch. Returns whether anything was written.
    pub fn commit(&self, patch: Option<Patch>) -> Result<bool> {
        let Some(patch) = patch else {
            return Ok(false);
        };

        let before = patch
            .before
            .as_ref()
            .map(|value| wsync_fs::io::to_pretty_json(&patch.path, value))
            .transpose()?;
        let after = wsync_fs::io::to_pretty_json(&patch.path, &patch.after)?;
        wsync_fs::io::write_atomic(&patch.path, after.as_bytes())?;

        let display = self
            .ctx
            .relative(&patch.path)
            .unwrap_or_else(|| patch.path.clone());
        notice::announce(display.as_str(), &patch.changes, before.as_deref(), &after);
        Ok(true)
    }
}
