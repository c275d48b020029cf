//! Incremental build artifact decoding
//!
//! The compiler records, per compiled file, the list of files it
//! references. The record is indexed: `referencedMap` pairs a file id with
//! a list id, `fileIdsList` holds the lists, and both ids are one-based
//! offsets into their arrays. Decoding turns that record into the set of
//! other workspaces the owning workspace actually uses.

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;
use tracing::debug;
use wsync_fs::{NormalizedPath, constants::DEPENDENCY_CACHE};

use crate::context::SyncContext;
use crate::registry::WorkspaceRegistry;
use crate::{Error, Result};

/// The part of `tsconfig.tsbuildinfo` wsync reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildInfo {
    #[serde(default)]
    pub program: Program,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    #[serde(default)]
    pub file_names: Vec<String>,
    /// `[fileId, listId]` pairs
    #[serde(default)]
    pub referenced_map: Vec<(usize, usize)>,
    #[serde(default)]
    pub file_ids_list: Vec<Vec<usize>>,
}

impl BuildInfo {
    /// Root-relative path of `fileNames[index]`, `None` when the file lies
    /// outside the root or inside a dependency cache.
    fn local_file(
        &self,
        root: &NormalizedPath,
        artifact_dir: &NormalizedPath,
        index: usize,
    ) -> Option<NormalizedPath> {
        let name = self.program.file_names.get(index)?;
        let resolved = if name.starts_with('/') {
            NormalizedPath::new(name).strip_prefix(root)?
        } else {
            artifact_dir.join(name)
        };
        if resolved.escapes_base() || resolved.contains_component(DEPENDENCY_CACHE) {
            return None;
        }
        Some(resolved)
    }

    /// `(file, referenced file)` pairs of zero-based indices, one pass over
    /// `referencedMap`. Pairs whose ids are out of range are skipped.
    fn references(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.program
            .referenced_map
            .iter()
            .filter_map(|&(file_id, list_id)| {
                let list = self.program.file_ids_list.get(list_id.checked_sub(1)?)?;
                Some((file_id.checked_sub(1)?, list))
            })
            .flat_map(|(index, list)| {
                list.iter()
                    .filter_map(move |id| id.checked_sub(1).map(|referenced| (index, referenced)))
            })
    }

    /// Names of the workspaces, other than `owner`, that local files of
    /// this artifact reference.
    ///
    /// `artifact_dir` is the root-relative directory holding the artifact;
    /// relative file names resolve against it. References into directories
    /// no watched workspace owns, and ids out of range, are dropped.
    ///
    /// # Errors
    ///
    /// [`Error::RegistryInvariant`] when `owner` has no registered name.
    pub fn local_dependencies(
        &self,
        root: &NormalizedPath,
        artifact_dir: &NormalizedPath,
        owner: &NormalizedPath,
        registry: &WorkspaceRegistry,
    ) -> Result<BTreeSet<String>> {
        let owner_name = registry.name(owner)?;
        let mut dependencies = BTreeSet::new();

        let mut local: HashMap<usize, Option<NormalizedPath>> = HashMap::new();
        let mut resolve = |index: usize| {
            local
                .entry(index)
                .or_insert_with(|| self.local_file(root, artifact_dir, index))
                .clone()
        };

        for (index, referenced) in self.references() {
            if resolve(index).is_none() {
                continue;
            }
            let Some(file) = resolve(referenced) else {
                continue;
            };
            let holder = registry.owner_of(&file);
            let Some(name) = holder.and_then(|ws| registry.try_name(ws)) else {
                debug!(file = %file, "reference outside any named workspace");
                continue;
            };
            if name != owner_name {
                dependencies.insert(name.to_string());
            }
        }
        Ok(dependencies)
    }
}

/// Workspace owning the artifact at `artifact`: `<ws>/.ts/tsconfig.tsbuildinfo`.
pub fn owner_of_artifact(artifact: &NormalizedPath) -> Option<NormalizedPath> {
    artifact.parent()?.parent()
}

/// Read and parse the artifact at the root-relative path `artifact`.
///
/// # Errors
///
/// [`Error::BuildInfoUnavailable`] when the file stays unreadable through
/// every retry or does not have the expected shape.
pub async fn read(ctx: &SyncContext, artifact: &NormalizedPath) -> Result<BuildInfo> {
    let absolute = ctx.absolute(artifact);
    let unavailable = |message: String| Error::BuildInfoUnavailable {
        path: absolute.to_native(),
        message,
    };

    let value = wsync_fs::read_json_retrying(&absolute, ctx.options().retry)
        .await
        .map_err(|e| unavailable(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| unavailable(e.to_string()))
}

/// Read the artifact at the root-relative path `artifact` and decode the
/// set of workspaces its owner depends on.
///
/// # Errors
///
/// [`Error::BuildInfoUnavailable`] as for [`read`];
/// [`Error::RegistryInvariant`] when the owner is not a named workspace.
pub async fn decode(ctx: &SyncContext, artifact: &NormalizedPath) -> Result<BTreeSet<String>> {
    let info = read(ctx, artifact).await?;
    let artifact_dir = artifact
        .parent()
        .ok_or_else(|| Error::invariant(format!("artifact path {artifact} has no parent")))?;
    let owner = owner_of_artifact(artifact).ok_or_else(|| {
        Error::invariant(format!("artifact path {artifact} has no owning workspace"))
    })?;

    let registry = ctx.registry();
    info.local_dependencies(ctx.root(), &artifact_dir, &owner, &registry)
}
