//! Shared synchronization context

use std::sync::{Mutex, MutexGuard};

use wsync_fs::{NormalizedPath, RetryPolicy, WorkspaceFile};

use crate::Result;
use crate::registry::WorkspaceRegistry;

/// Behaviour switches derived from the command line.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Log a suggested removal command for declared-but-unused workspace dependencies
    pub report_redundant: bool,
    /// Remove declared-but-unused workspace dependencies from manifests
    pub remove_redundant: bool,
    /// Schedule for reading build artifacts that are still being written
    pub retry: RetryPolicy,
}

/// State shared by every event handler: the project root, the options and
/// the workspace registry.
///
/// The registry lock is synchronous and must never be held across an
/// `.await`; take what you need, drop the guard, then suspend.
#[derive(Debug)]
pub struct SyncContext {
    root: NormalizedPath,
    options: SyncOptions,
    registry: Mutex<WorkspaceRegistry>,
}

impl SyncContext {
    /// Create a context for the project rooted at `root`, which is resolved
    /// to its canonical absolute form.
    pub fn new(root: impl Into<NormalizedPath>, options: SyncOptions) -> Result<Self> {
        let root = root.into().canonicalize()?;
        Ok(Self {
            root,
            options,
            registry: Mutex::new(WorkspaceRegistry::new()),
        })
    }

    /// Absolute, canonical project root.
    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Lock the registry.
    pub fn registry(&self) -> MutexGuard<'_, WorkspaceRegistry> {
        // Registry mutators never leave partial state, so a poisoned lock is still usable.
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Absolute path of a root-relative path.
    pub fn absolute(&self, relative: &NormalizedPath) -> NormalizedPath {
        self.root.join(relative.as_str())
    }

    /// Root-relative path of an absolute path; `None` outside the root.
    pub fn relative(&self, absolute: &NormalizedPath) -> Option<NormalizedPath> {
        absolute.strip_prefix(&self.root)
    }

    /// Absolute path of a workspace file.
    pub fn workspace_file(
        &self,
        workspace: &NormalizedPath,
        file: WorkspaceFile,
    ) -> NormalizedPath {
        self.absolute(&workspace.join(file.as_str()))
    }

    /// Absolute path of a file at the project root.
    pub fn root_file(&self, file: WorkspaceFile) -> NormalizedPath {
        self.root.join(file.as_str())
    }
}
