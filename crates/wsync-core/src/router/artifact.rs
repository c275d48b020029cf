//! Build artifact state machine

use std::collections::BTreeSet;

use tracing::{debug, info, warn};
use wsync_fs::{NormalizedPath, WorkspaceFile};

use super::event::FsEventKind;
use crate::buildinfo::{self, BuildInfo};
use crate::context::SyncContext;
use crate::registry::ArtifactState;
use crate::sync::{ConfigSynchronizer, DependencyDiff};
use crate::{Error, Result};

pub(super) async fn on_build_info(
    ctx: &SyncContext,
    workspace: &NormalizedPath,
    kind: FsEventKind,
) -> Result<()> {
    match kind {
        FsEventKind::Delete => {
            let previous = ctx
                .registry()
                .set_artifact_state(workspace, Some(ArtifactState::Missing));
            if previous == Some(ArtifactState::Present) {
                info!(workspace = %workspace, "build artifact removed, synchronization paused");
            }
            Ok(())
        }
        FsEventKind::Create | FsEventKind::Update => {
            let previous = ctx
                .registry()
                .set_artifact_state(workspace, Some(ArtifactState::Present));
            if previous == Some(ArtifactState::Missing) {
                info!(workspace = %workspace, "build artifact restored, synchronization resumed");
            }
            process(ctx, workspace).await
        }
    }
}

/// Decode `workspace`'s artifact and bring its manifest and references in
/// line with what it actually uses.
pub(super) async fn process(ctx: &SyncContext, workspace: &NormalizedPath) -> Result<()> {
    if !is_ready(ctx, workspace) {
        debug!(workspace = %workspace, "not ready, skipping build artifact");
        return Ok(());
    }

    let artifact = workspace.join(WorkspaceFile::BuildInfo.as_str());
    let info = match buildinfo::read(ctx, &artifact).await {
        Ok(info) => info,
        Err(e @ Error::BuildInfoUnavailable { .. }) => {
            warn!(workspace = %workspace, "{}", e);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    // The workspace may have changed while the artifact was being read.
    let Some((discovered, declared)) = compare(ctx, workspace, &artifact, &info)? else {
        debug!(workspace = %workspace, "no longer ready, dropping build artifact");
        return Ok(());
    };

    let sync = ConfigSynchronizer::new(ctx);
    let diff = DependencyDiff::between(&declared, &discovered);
    if !diff.is_empty() {
        debug!(
            workspace = %workspace,
            missing = ?diff.missing,
            redundant = ?diff.redundant,
            "dependency drift"
        );
        sync.reconcile_dependencies(workspace, &diff)?;
    }

    let dependencies = {
        let registry = ctx.registry();
        match registry.try_name(workspace) {
            Some(name) => registry.workspace_dependencies(name)?,
            None => return Ok(()),
        }
    };
    sync.update_references(workspace, &dependencies)?;
    Ok(())
}

fn is_ready(ctx: &SyncContext, workspace: &NormalizedPath) -> bool {
    let registry = ctx.registry();
    registry.has_all_requirements(workspace)
        && registry.artifact_state(workspace) == Some(ArtifactState::Present)
}

/// Discovered and declared workspace dependencies, `None` when the
/// workspace stopped being ready.
fn compare(
    ctx: &SyncContext,
    workspace: &NormalizedPath,
    artifact: &NormalizedPath,
    info: &BuildInfo,
) -> Result<Option<(BTreeSet<String>, BTreeSet<String>)>> {
    let registry = ctx.registry();
    if !registry.has_all_requirements(workspace) {
        return Ok(None);
    }
    let Some(artifact_dir) = artifact.parent() else {
        return Ok(None);
    };
    let discovered = info.local_dependencies(ctx.root(), &artifact_dir, workspace, &registry)?;
    let name = registry.name(workspace)?;
    let declared = registry.workspace_dependencies(name)?;
    Ok(Some((discovered, declared)))
}
