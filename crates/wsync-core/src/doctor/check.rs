//! Check types for the doctor report

use std::fmt;

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Already correct
    Passed,
    /// Was wrong and has been corrected
    Fixed,
    /// Wrong and left as is
    Failed,
    /// Worth a look, never fails the run
    Advisory,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Passed => "ok",
            Self::Fixed => "fixed",
            Self::Failed => "failed",
            Self::Advisory => "advice",
        };
        f.write_str(label)
    }
}

/// Kind of check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    EmptyDirectory,
    Manifest,
    Name,
    Config,
    Settings,
    Dependencies,
    RedundantDependencies,
    References,
    RootManifest,
    RootConfig,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyDirectory => "directory",
            Self::Manifest => "package.json",
            Self::Name => "name",
            Self::Config => "tsconfig.json",
            Self::Settings => "compiler settings",
            Self::Dependencies => "dependencies",
            Self::RedundantDependencies => "unused dependencies",
            Self::References => "references",
            Self::RootManifest => "root package.json",
            Self::RootConfig => "root tsconfig.json",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckItem {
    /// Root-relative workspace path, `.` for the root
    pub subject: String,
    pub kind: CheckKind,
    pub status: CheckStatus,
    /// Human-readable explanation for anything but a pass
    pub detail: Option<String>,
}

impl CheckItem {
    pub fn passed(subject: impl Into<String>, kind: CheckKind) -> Self {
        Self {
            subject: subject.into(),
            kind,
            status: CheckStatus::Passed,
            detail: None,
        }
    }

    pub fn with_status(
        subject: impl Into<String>,
        kind: CheckKind,
        status: CheckStatus,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            kind,
            status,
            detail: Some(detail.into()),
        }
    }
}

/// Result of a doctor run
#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    pub items: Vec<CheckItem>,
    /// False when the project root has no manifest at all
    pub root_manifest_found: bool,
}

impl DoctorReport {
    pub fn push(&mut self, item: CheckItem) {
        self.items.push(item);
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.items.iter().filter(|item| item.status == status).count()
    }

    /// True when the root manifest exists and no check failed.
    pub fn is_healthy(&self) -> bool {
        self.root_manifest_found && self.count(CheckStatus::Failed) == 0
    }

    /// Process exit status for this report.
    pub fn exit_code(&self) -> i32 {
        if self.is_healthy() { 0 } else { 1 }
    }
}
