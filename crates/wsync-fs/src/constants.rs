//! Conventional file locations inside a workspace.

use std::path::Path;

/// Directory name of the package manager's dependency cache.
pub const DEPENDENCY_CACHE: &str = "node_modules";

/// Files wsync derives from a workspace directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkspaceFile {
    /// `package.json`
    Manifest,
    /// `tsconfig.json`
    ProjectConfig,
    /// `.ts` (compiler output directory)
    OutDir,
    /// `.ts/tsconfig.tsbuildinfo` (incremental build artifact)
    BuildInfo,
}

impl WorkspaceFile {
    /// Path relative to the workspace directory.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manifest => "package.json",
            Self::ProjectConfig => "tsconfig.json",
            Self::OutDir => ".ts",
            Self::BuildInfo => ".ts/tsconfig.tsbuildinfo",
        }
    }

    /// Classify a path relative to a workspace directory.
    pub fn from_relative(relative: &str) -> Option<Self> {
        [Self::Manifest, Self::ProjectConfig, Self::BuildInfo]
            .into_iter()
            .find(|file| file.as_str() == relative)
    }
}

impl AsRef<Path> for WorkspaceFile {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for WorkspaceFile {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for WorkspaceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
