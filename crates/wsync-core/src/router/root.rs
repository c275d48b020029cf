//! Root manifest state machine

use std::collections::BTreeSet;

use tracing::{debug, info, warn};
use wsync_fs::constants::DEPENDENCY_CACHE;
use wsync_fs::{NormalizedPath, WorkspaceFile};

use super::event::FsEventKind;
use super::workspace;
use crate::context::SyncContext;
use crate::discovery::{expand_workspaces, matches_workspace};
use crate::document::Manifest;
use crate::sync::ConfigSynchronizer;
use crate::Result;

pub(super) async fn on_root_manifest(ctx: &SyncContext, kind: FsEventKind) -> Result<()> {
    match kind {
        FsEventKind::Delete => {
            pause(ctx);
            Ok(())
        }
        FsEventKind::Create | FsEventKind::Update => refresh(ctx).await,
    }
}

/// A manifest or config event under a directory that is not watched.
///
/// When the directory is selected by the root manifest's globs it is a
/// workspace created after the workspace set was last computed, and it is
/// brought up on its own.
pub(super) async fn on_unwatched_file(
    ctx: &SyncContext,
    relative: &NormalizedPath,
    kind: FsEventKind,
) -> Result<()> {
    if kind == FsEventKind::Delete {
        return Ok(());
    }
    let Some(dir) = candidate_workspace(ctx, relative) else {
        return Ok(());
    };

    let path = ctx.root_file(WorkspaceFile::Manifest);
    let manifest = match Manifest::load(&path) {
        Ok(Some(manifest)) => manifest,
        Ok(None) => return Ok(()),
        Err(e) => {
            debug!(workspace = %dir, "root manifest unreadable, not adding: {}", e);
            return Ok(());
        }
    };
    if !matches_workspace(&manifest.workspaces(), &dir)? || !ctx.absolute(&dir).is_dir() {
        return Ok(());
    }
    let added = ctx.registry().watch(dir.clone());
    if !added {
        return Ok(());
    }
    info!(workspace = %dir, "watching workspace");

    workspace::apply_identity(ctx, &dir)?;
    workspace::synchronize(ctx, &dir, false).await?;

    let name = {
        let registry = ctx.registry();
        registry
            .try_name(&dir)
            .filter(|_| registry.has_all_requirements(&dir))
            .map(str::to_owned)
    };
    if let Some(name) = name {
        workspace::resync_dependents(ctx, &name)?;
    }
    ConfigSynchronizer::new(ctx).update_root_references()?;
    Ok(())
}

/// Directory of a workspace manifest or config path, unless it is the
/// root, already watched or inside a dependency cache.
fn candidate_workspace(ctx: &SyncContext, relative: &NormalizedPath) -> Option<NormalizedPath> {
    match WorkspaceFile::from_relative(relative.file_name()?)? {
        WorkspaceFile::Manifest | WorkspaceFile::ProjectConfig => {}
        WorkspaceFile::OutDir | WorkspaceFile::BuildInfo => return None,
    }
    let dir = relative.parent()?;
    let watched = ctx.registry().is_watched(&dir);
    if watched || dir.is_base() || dir.contains_component(DEPENDENCY_CACHE) {
        return None;
    }
    Some(dir)
}

fn pause(ctx: &SyncContext) {
    ctx.registry().clear();
    info!("root manifest removed, synchronization paused");
}

/// Recompute the workspace set and bring added workspaces up.
async fn refresh(ctx: &SyncContext) -> Result<()> {
    let path = ctx.root_file(WorkspaceFile::Manifest);
    let manifest = match Manifest::load(&path) {
        Ok(Some(manifest)) => manifest,
        Ok(None) => {
            pause(ctx);
            return Ok(());
        }
        Err(e) => {
            warn!("root manifest unreadable, keeping current workspaces: {}", e);
            return Ok(());
        }
    };

    let discovered = expand_workspaces(ctx.root(), &manifest.workspaces())?;
    let (added, removed_names) = apply_workspace_set(ctx, &discovered);

    for workspace in &added {
        workspace::apply_identity(ctx, workspace)?;
    }
    for workspace in &added {
        workspace::synchronize(ctx, workspace, false).await?;
    }

    let mut touched_names: BTreeSet<String> = removed_names;
    {
        let registry = ctx.registry();
        touched_names.extend(
            added
                .iter()
                .filter(|ws| registry.has_all_requirements(ws))
                .filter_map(|ws| registry.try_name(ws).map(str::to_owned)),
        );
    }
    for name in &touched_names {
        workspace::resync_dependents(ctx, name)?;
    }

    ConfigSynchronizer::new(ctx).update_root_references()?;
    Ok(())
}

/// Watch `discovered` and unwatch everything else. Returns the newly
/// watched workspaces and the names of the unwatched ones.
fn apply_workspace_set(
    ctx: &SyncContext,
    discovered: &BTreeSet<NormalizedPath>,
) -> (Vec<NormalizedPath>, BTreeSet<String>) {
    let mut registry = ctx.registry();
    let current = registry.watched_paths();

    let mut removed_names = BTreeSet::new();
    for gone in current.difference(discovered) {
        info!(workspace = %gone, "workspace removed");
        if let Some(name) = registry.unwatch(gone) {
            removed_names.insert(name);
        }
    }

    let added: Vec<NormalizedPath> = discovered.difference(&current).cloned().collect();
    for workspace in &added {
        info!(workspace = %workspace, "watching workspace");
        registry.watch(workspace.clone());
    }
    (added, removed_names)
}
