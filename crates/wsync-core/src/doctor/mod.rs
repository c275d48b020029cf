//! One-shot consistency checks
//!
//! The doctor rebuilds the registry from disk, reports every workspace's
//! manifest, config, dependency and reference state and optionally repairs
//! what it can using the [`ConfigSynchronizer`].

mod check;

use std::collections::BTreeSet;

use tracing::debug;
use wsync_fs::{NormalizedPath, WorkspaceFile};

pub use check::{CheckItem, CheckKind, CheckStatus, DoctorReport};

use crate::buildinfo;
use crate::context::SyncContext;
use crate::discovery::expand_workspaces;
use crate::document::{Manifest, ProjectConfig};
use crate::registry::{ArtifactState, Readiness};
use crate::router::workspace::apply_identity;
use crate::sync::{ConfigSynchronizer, DependencyDiff};
use crate::{Error, Result};

/// Options for a doctor run
#[derive(Debug, Clone, Copy, Default)]
pub struct DoctorOptions {
    /// Repair failing config and dependency checks
    pub fix: bool,
    /// Remove empty workspace directories
    pub delete: bool,
    /// Report (and with `fix`, remove) unused workspace dependencies
    pub redundant: bool,
}

const ROOT_SUBJECT: &str = ".";

/// Runs the checks against a fresh [`SyncContext`].
pub struct Doctor<'a> {
    ctx: &'a SyncContext,
    options: DoctorOptions,
}

impl<'a> Doctor<'a> {
    pub fn new(ctx: &'a SyncContext, options: DoctorOptions) -> Self {
        Self { ctx, options }
    }

    fn sync(&self) -> ConfigSynchronizer<'a> {
        ConfigSynchronizer::new(self.ctx)
    }

    /// Run every check.
    ///
    /// # Errors
    ///
    /// Returns an error only for I/O failures and registry invariant
    /// violations; everything else becomes a report item.
    pub async fn run(&self) -> Result<DoctorReport> {
        let mut report = DoctorReport::default();

        let root_manifest = self.ctx.root_file(WorkspaceFile::Manifest);
        let manifest = match Manifest::load(&root_manifest) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                report.push(CheckItem::with_status(
                    ROOT_SUBJECT,
                    CheckKind::RootManifest,
                    CheckStatus::Failed,
                    "not found",
                ));
                return Ok(report);
            }
            Err(e) => {
                report.push(CheckItem::with_status(
                    ROOT_SUBJECT,
                    CheckKind::RootManifest,
                    CheckStatus::Failed,
                    e.to_string(),
                ));
                return Ok(report);
            }
        };
        report.root_manifest_found = true;
        report.push(CheckItem::passed(ROOT_SUBJECT, CheckKind::RootManifest));

        let discovered = match expand_workspaces(self.ctx.root(), &manifest.workspaces()) {
            Ok(discovered) => discovered,
            Err(e @ Error::InvalidPattern { .. }) => {
                report.push(CheckItem::with_status(
                    ROOT_SUBJECT,
                    CheckKind::RootManifest,
                    CheckStatus::Failed,
                    e.to_string(),
                ));
                return Ok(report);
            }
            Err(e) => return Err(e),
        };

        let mut workspaces = Vec::new();
        for workspace in discovered {
            if self.check_empty(&workspace, &mut report)? {
                continue;
            }
            self.ctx.registry().watch(workspace.clone());
            apply_identity(self.ctx, &workspace)?;
            self.check_structure(&workspace, &mut report)?;
            workspaces.push(workspace);
        }

        for workspace in &workspaces {
            self.check_dependencies(workspace, &mut report).await?;
        }
        for workspace in &workspaces {
            self.check_references(workspace, &mut report)?;
        }
        self.check_root_config(&mut report)?;

        debug!(
            passed = report.count(CheckStatus::Passed),
            fixed = report.count(CheckStatus::Fixed),
            failed = report.count(CheckStatus::Failed),
            "doctor finished"
        );
        Ok(report)
    }

    /// Report (and with `delete`, remove) a workspace directory with nothing in it.
    fn check_empty(
        &self,
        workspace: &NormalizedPath,
        report: &mut DoctorReport,
    ) -> Result<bool> {
        let absolute = self.ctx.absolute(workspace);
        let native = absolute.to_native();
        let mut entries =
            std::fs::read_dir(&native).map_err(|e| wsync_fs::Error::io(&native, e))?;
        if entries.next().is_some() {
            return Ok(false);
        }

        let subject = workspace.as_str();
        if self.options.delete {
            wsync_fs::io::remove_dir_all(&absolute)?;
            report.push(CheckItem::with_status(
                subject,
                CheckKind::EmptyDirectory,
                CheckStatus::Fixed,
                "removed empty directory",
            ));
        } else {
            report.push(CheckItem::with_status(
                subject,
                CheckKind::EmptyDirectory,
                CheckStatus::Failed,
                "empty directory (remove with --delete)",
            ));
        }
        Ok(true)
    }

    /// Manifest, name, config presence and compiler settings.
    fn check_structure(
        &self,
        workspace: &NormalizedPath,
        report: &mut DoctorReport,
    ) -> Result<()> {
        let subject = workspace.as_str();
        let readiness = self.ctx.registry().readiness(workspace);

        if readiness.contains(Readiness::HAS_MANIFEST) {
            report.push(CheckItem::passed(subject, CheckKind::Manifest));
        } else {
            report.push(CheckItem::with_status(
                subject,
                CheckKind::Manifest,
                CheckStatus::Failed,
                "not found",
            ));
        }

        if readiness.contains(Readiness::HAS_NAME) {
            report.push(CheckItem::passed(subject, CheckKind::Name));
        } else if readiness.contains(Readiness::HAS_MANIFEST) {
            report.push(CheckItem::with_status(
                subject,
                CheckKind::Name,
                CheckStatus::Failed,
                "package.json is invalid or declares no name",
            ));
        }

        let config_path = self.ctx.workspace_file(workspace, WorkspaceFile::ProjectConfig);
        let config = match ProjectConfig::load(&config_path) {
            Ok(config) => config,
            Err(e) => {
                report.push(CheckItem::with_status(
                    subject,
                    CheckKind::Config,
                    CheckStatus::Failed,
                    e.to_string(),
                ));
                return Ok(());
            }
        };

        match config {
            Some(config) => {
                report.push(CheckItem::passed(subject, CheckKind::Config));
                if config.has_workspace_settings() {
                    report.push(CheckItem::passed(subject, CheckKind::Settings));
                } else if self.options.fix {
                    self.sync().update_workspace_settings(workspace)?;
                    report.push(CheckItem::with_status(
                        subject,
                        CheckKind::Settings,
                        CheckStatus::Fixed,
                        "applied composite, outDir and tsBuildInfoFile",
                    ));
                } else {
                    report.push(CheckItem::with_status(
                        subject,
                        CheckKind::Settings,
                        CheckStatus::Failed,
                        "composite, outDir or tsBuildInfoFile differ from the defaults",
                    ));
                }
            }
            None if self.options.fix => {
                self.sync().update_workspace_settings(workspace)?;
                self.ctx
                    .registry()
                    .add_requirement(workspace, Readiness::HAS_BUILD_CONFIG);
                report.push(CheckItem::with_status(
                    subject,
                    CheckKind::Config,
                    CheckStatus::Fixed,
                    "created tsconfig.json",
                ));
            }
            None => {
                report.push(CheckItem::with_status(
                    subject,
                    CheckKind::Config,
                    CheckStatus::Failed,
                    "not found",
                ));
            }
        }
        Ok(())
    }

    /// Compare declared workspace dependencies with the build artifact.
    async fn check_dependencies(
        &self,
        workspace: &NormalizedPath,
        report: &mut DoctorReport,
    ) -> Result<()> {
        let subject = workspace.as_str();
        let name = {
            let registry = self.ctx.registry();
            if !registry.has_all_requirements(workspace) {
                return Ok(());
            }
            registry.name(workspace)?.to_string()
        };

        let artifact = workspace.join(WorkspaceFile::BuildInfo.as_str());
        if !self.ctx.absolute(&artifact).is_file() {
            report.push(CheckItem::with_status(
                subject,
                CheckKind::Dependencies,
                CheckStatus::Advisory,
                "no build artifact yet, run the compiler to check dependencies",
            ));
            return Ok(());
        }
        self.ctx
            .registry()
            .set_artifact_state(workspace, Some(ArtifactState::Present));

        let discovered = match buildinfo::decode(self.ctx, &artifact).await {
            Ok(discovered) => discovered,
            Err(e @ Error::BuildInfoUnavailable { .. }) => {
                report.push(CheckItem::with_status(
                    subject,
                    CheckKind::Dependencies,
                    CheckStatus::Advisory,
                    e.to_string(),
                ));
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let declared = self.ctx.registry().workspace_dependencies(&name)?;
        let diff = DependencyDiff::between(&declared, &discovered);

        if diff.missing.is_empty() {
            report.push(CheckItem::passed(subject, CheckKind::Dependencies));
        } else {
            let listed = join(&diff.missing);
            if self.options.fix {
                self.sync()
                    .update_dependencies(workspace, &diff.missing, &BTreeSet::new())?;
                report.push(CheckItem::with_status(
                    subject,
                    CheckKind::Dependencies,
                    CheckStatus::Fixed,
                    format!("added {listed}"),
                ));
            } else {
                report.push(CheckItem::with_status(
                    subject,
                    CheckKind::Dependencies,
                    CheckStatus::Failed,
                    format!("missing {listed}"),
                ));
            }
        }

        if self.options.redundant && !diff.redundant.is_empty() {
            let listed = join(&diff.redundant);
            if self.options.fix {
                self.sync()
                    .update_dependencies(workspace, &BTreeSet::new(), &diff.redundant)?;
                report.push(CheckItem::with_status(
                    subject,
                    CheckKind::RedundantDependencies,
                    CheckStatus::Fixed,
                    format!("removed {listed}"),
                ));
            } else {
                report.push(CheckItem::with_status(
                    subject,
                    CheckKind::RedundantDependencies,
                    CheckStatus::Advisory,
                    format!(
                        "unused {listed}, remove with: npm uninstall --workspace {subject} {listed}"
                    ),
                ));
            }
        }

        if self.options.fix {
            self.reload_dependencies(workspace, &name)?;
        }
        Ok(())
    }

    fn reload_dependencies(&self, workspace: &NormalizedPath, name: &str) -> Result<()> {
        let path = self.ctx.workspace_file(workspace, WorkspaceFile::Manifest);
        let declared = Manifest::load(&path)?
            .map(|manifest| manifest.dependency_names())
            .unwrap_or_default();
        self.ctx.registry().set_dependencies(name, declared)
    }

    fn check_references(
        &self,
        workspace: &NormalizedPath,
        report: &mut DoctorReport,
    ) -> Result<()> {
        let subject = workspace.as_str();
        let dependencies = {
            let registry = self.ctx.registry();
            if !registry.has_all_requirements(workspace) {
                return Ok(());
            }
            let name = registry.name(workspace)?;
            registry.workspace_dependencies(name)?
        };

        let Some(patch) = self.sync().plan_references(workspace, &dependencies)? else {
            report.push(CheckItem::passed(subject, CheckKind::References));
            return Ok(());
        };

        let changes = patch
            .changes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let status = if self.options.fix {
            self.sync().commit(Some(patch))?;
            CheckStatus::Fixed
        } else {
            CheckStatus::Failed
        };
        report.push(CheckItem::with_status(
            subject,
            CheckKind::References,
            status,
            changes,
        ));
        Ok(())
    }

    fn check_root_config(&self, report: &mut DoctorReport) -> Result<()> {
        let sync = self.sync();
        if sync.root_config_satisfied()? {
            report.push(CheckItem::passed(ROOT_SUBJECT, CheckKind::RootConfig));
            return Ok(());
        }

        if self.options.fix {
            sync.update_root_references()?;
            report.push(CheckItem::with_status(
                ROOT_SUBJECT,
                CheckKind::RootConfig,
                CheckStatus::Fixed,
                "updated settings and references",
            ));
        } else {
            report.push(CheckItem::with_status(
                ROOT_SUBJECT,
                CheckKind::RootConfig,
                CheckStatus::Failed,
                "missing, or settings and references are out of date",
            ));
        }
        Ok(())
    }
}

fn join(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}
