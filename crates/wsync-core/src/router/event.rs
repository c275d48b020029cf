//! Filesystem events and their classification

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use wsync_fs::{NormalizedPath, WorkspaceFile};

use crate::registry::WorkspaceRegistry;

/// Kind of change observed on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Create,
    Update,
    Delete,
}

/// A change to one absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: NormalizedPath,
}

impl FsEvent {
    pub fn new(kind: FsEventKind, path: impl Into<NormalizedPath>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Convert a raw notify event.
///
/// A rename is split into a delete of the source and a create of the
/// destination. When the backend cannot tell which side a path is on,
/// its current existence decides.
pub fn convert_event(event: Event) -> Vec<FsEvent> {
    let paths = event.paths.into_iter().map(NormalizedPath::from);
    match event.kind {
        EventKind::Create(_) => paths.map(|p| FsEvent::new(FsEventKind::Create, p)).collect(),
        EventKind::Remove(_) => paths.map(|p| FsEvent::new(FsEventKind::Delete, p)).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.map(|p| FsEvent::new(FsEventKind::Delete, p)).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.map(|p| FsEvent::new(FsEventKind::Create, p)).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut paths = paths;
            let mut events = Vec::new();
            if let Some(from) = paths.next() {
                events.push(FsEvent::new(FsEventKind::Delete, from));
            }
            events.extend(paths.map(|to| FsEvent::new(FsEventKind::Create, to)));
            events
        }
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .map(|p| {
                let kind = if p.exists() {
                    FsEventKind::Create
                } else {
                    FsEventKind::Delete
                };
                FsEvent::new(kind, p)
            })
            .collect(),
        EventKind::Modify(_) => paths.map(|p| FsEvent::new(FsEventKind::Update, p)).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

/// What a path means to the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `<root>/package.json`
    RootManifest,
    /// `<ws>/package.json` of a watched workspace
    WorkspaceManifest(NormalizedPath),
    /// `<ws>/tsconfig.json` of a watched workspace
    WorkspaceConfig(NormalizedPath),
    /// `<ws>/.ts/tsconfig.tsbuildinfo` of a workspace whose artifact is watched
    BuildInfo(NormalizedPath),
    Ignored,
}

/// Classify a root-relative path against the registry.
pub fn classify(registry: &WorkspaceRegistry, relative: &NormalizedPath) -> Target {
    if relative.as_str() == WorkspaceFile::Manifest.as_str() {
        return Target::RootManifest;
    }
    let Some(workspace) = registry.owner_of(relative) else {
        return Target::Ignored;
    };
    let Some(inner) = relative.strip_prefix(workspace) else {
        return Target::Ignored;
    };
    match WorkspaceFile::from_relative(inner.as_str()) {
        Some(WorkspaceFile::Manifest) => Target::WorkspaceManifest(workspace.clone()),
        Some(WorkspaceFile::ProjectConfig) => Target::WorkspaceConfig(workspace.clone()),
        Some(WorkspaceFile::BuildInfo) if registry.artifact_state(workspace).is_some() => {
            Target::BuildInfo(workspace.clone())
        }
        _ => Target::Ignored,
    }
}
