//! Workspace state machine: manifest identity and config presence

use std::collections::BTreeSet;

use tracing::{debug, info, warn};
use wsync_fs::{NormalizedPath, WorkspaceFile};

use super::artifact;
use super::event::FsEventKind;
use crate::context::SyncContext;
use crate::document::Manifest;
use crate::registry::{ArtifactState, Readiness};
use crate::sync::ConfigSynchronizer;
use crate::Result;

/// Matching flag and name of a workspace at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    matching: bool,
    name: Option<String>,
}

fn snapshot(ctx: &SyncContext, workspace: &NormalizedPath) -> Snapshot {
    let registry = ctx.registry();
    Snapshot {
        matching: registry.has_all_requirements(workspace),
        name: registry.try_name(workspace).map(str::to_owned),
    }
}

pub(super) async fn on_manifest(
    ctx: &SyncContext,
    workspace: &NormalizedPath,
    kind: FsEventKind,
) -> Result<()> {
    let before = snapshot(ctx, workspace);
    match kind {
        FsEventKind::Delete => on_manifest_removed(ctx, workspace),
        FsEventKind::Create | FsEventKind::Update => {
            apply_identity(ctx, workspace)?;
            synchronize(ctx, workspace, before.matching).await?;
        }
    }
    propagate(ctx, workspace, &before)
}

pub(super) async fn on_config(
    ctx: &SyncContext,
    workspace: &NormalizedPath,
    kind: FsEventKind,
) -> Result<()> {
    let before = snapshot(ctx, workspace);
    let present = ctx.registry().has_requirement(workspace, Readiness::HAS_BUILD_CONFIG);
    match kind {
        FsEventKind::Create | FsEventKind::Update if present => {
            debug!(workspace = %workspace, "config changed, nothing to do");
            return Ok(());
        }
        FsEventKind::Create | FsEventKind::Update => {
            ctx.registry().add_requirement(workspace, Readiness::HAS_BUILD_CONFIG);
            synchronize(ctx, workspace, before.matching).await?;
        }
        FsEventKind::Delete => {
            ctx.registry().remove_requirement(workspace, Readiness::HAS_BUILD_CONFIG);
        }
    }
    propagate(ctx, workspace, &before)
}

fn on_manifest_removed(ctx: &SyncContext, workspace: &NormalizedPath) {
    let mut registry = ctx.registry();
    registry.remove_requirement(workspace, Readiness::HAS_MANIFEST | Readiness::HAS_NAME);
    registry.clear_name(workspace);
    registry.set_artifact_state(workspace, None);
    info!(workspace = %workspace, "manifest removed");
}

/// Read `workspace`'s manifest and config and record readiness, name and
/// dependencies. A name change is propagated to dependents before the
/// workspace's own dependencies are replaced.
///
/// A workspace whose name was cleared (manifest deleted or unreadable)
/// and comes back under another name counts as renamed, as long as no
/// other workspace has claimed the old name in between.
pub(crate) fn apply_identity(ctx: &SyncContext, workspace: &NormalizedPath) -> Result<()> {
    let config_present = ctx
        .workspace_file(workspace, WorkspaceFile::ProjectConfig)
        .is_file();
    {
        let mut registry = ctx.registry();
        if config_present {
            registry.add_requirement(workspace, Readiness::HAS_BUILD_CONFIG);
        } else {
            registry.remove_requirement(workspace, Readiness::HAS_BUILD_CONFIG);
        }
    }

    let path = ctx.workspace_file(workspace, WorkspaceFile::Manifest);
    let manifest = match Manifest::load(&path) {
        Ok(Some(manifest)) => manifest,
        Ok(None) => {
            let mut registry = ctx.registry();
            registry.remove_requirement(workspace, Readiness::HAS_MANIFEST | Readiness::HAS_NAME);
            registry.clear_name(workspace);
            return Ok(());
        }
        Err(e) => {
            warn!(workspace = %workspace, "manifest unreadable: {}", e);
            let mut registry = ctx.registry();
            registry.add_requirement(workspace, Readiness::HAS_MANIFEST);
            registry.remove_requirement(workspace, Readiness::HAS_NAME);
            registry.clear_name(workspace);
            return Ok(());
        }
    };

    let Some(name) = manifest.name() else {
        warn!(workspace = %workspace, "manifest declares no name");
        let mut registry = ctx.registry();
        registry.add_requirement(workspace, Readiness::HAS_MANIFEST);
        registry.remove_requirement(workspace, Readiness::HAS_NAME);
        registry.clear_name(workspace);
        return Ok(());
    };

    let previous = {
        let mut registry = ctx.registry();
        registry.add_requirement(workspace, Readiness::HAS_MANIFEST | Readiness::HAS_NAME);
        let current = registry.try_name(workspace).map(str::to_owned);
        let previous = current.clone().or_else(|| {
            registry
                .last_name(workspace)
                .filter(|old| !registry.is_workspace_name(old))
                .map(str::to_owned)
        });
        if current.as_deref() != Some(name)
            && let Some(displaced) = registry.set_name(workspace, name)?
        {
            warn!(
                workspace = %workspace,
                other = %displaced,
                "name {} was declared by another workspace", name
            );
        }
        previous
    };

    if let Some(old) = previous.filter(|old| old != name) {
        info!(workspace = %workspace, "renamed {} -> {}", old, name);
        ConfigSynchronizer::new(ctx).rename_references(&old, name, workspace)?;
    }

    ctx.registry().set_dependencies(name, manifest.dependency_names())
}

/// Bring a workspace's artifact watch and references up to date.
///
/// The first time this runs for a workspace the artifact starts being
/// watched. A present artifact is processed whenever the workspace has
/// just become matching (`was_matching` is its state before the event).
pub(super) async fn synchronize(
    ctx: &SyncContext,
    workspace: &NormalizedPath,
    was_matching: bool,
) -> Result<()> {
    let artifact_exists = ctx
        .workspace_file(workspace, WorkspaceFile::BuildInfo)
        .is_file();
    let artifact_pending = {
        let mut registry = ctx.registry();
        let watched = registry.artifact_state(workspace).is_some();
        if !watched && registry.has_requirement(workspace, Readiness::HAS_MANIFEST) {
            let state = if artifact_exists {
                ArtifactState::Present
            } else {
                ArtifactState::Absent
            };
            registry.set_artifact_state(workspace, Some(state));
        }
        !was_matching
            && registry.has_all_requirements(workspace)
            && registry.artifact_state(workspace) == Some(ArtifactState::Present)
    };

    if artifact_pending {
        return artifact::process(ctx, workspace).await;
    }
    sync_references(ctx, workspace)
}

/// Re-run reference sync for `workspace` from its recorded dependencies.
fn sync_references(ctx: &SyncContext, workspace: &NormalizedPath) -> Result<()> {
    let dependencies = {
        let registry = ctx.registry();
        if !registry.has_all_requirements(workspace) {
            debug!(workspace = %workspace, "not ready, skipping reference sync");
            return Ok(());
        }
        let name = registry.name(workspace)?;
        registry.workspace_dependencies(name)?
    };
    ConfigSynchronizer::new(ctx).update_references(workspace, &dependencies)?;
    Ok(())
}

/// Re-run reference sync for every workspace depending on `name`.
pub(super) fn resync_dependents(ctx: &SyncContext, name: &str) -> Result<()> {
    let dependents = ctx.registry().dependents_of(name);
    for (workspace, _) in dependents {
        sync_references(ctx, &workspace)?;
    }
    Ok(())
}

/// After a transition, refresh dependents and the root config if the
/// workspace started or stopped matching or changed its name.
fn propagate(ctx: &SyncContext, workspace: &NormalizedPath, before: &Snapshot) -> Result<()> {
    let after = snapshot(ctx, workspace);
    if after == *before {
        return Ok(());
    }
    let names: BTreeSet<&String> = [&before.name, &after.name].into_iter().flatten().collect();
    for name in names {
        resync_dependents(ctx, name)?;
    }
    if before.matching != after.matching {
        ConfigSynchronizer::new(ctx).update_root_references()?;
    }
    Ok(())
}
