//! Workspace dependency synchronization engine for wsync
//!
//! This crate keeps a multi-package workspace's project references, path
//! aliases and manifest dependencies in line with what the incremental
//! compiler actually sees, implementing:
//!
//! - **Registry**: workspace identity, declared dependencies and readiness
//! - **Build artifact decoding**: the set of workspaces a workspace really uses
//! - **ConfigSynchronizer**: pure diffs plus write-if-changed rewrites
//! - **EventRouter**: filesystem events driving the per-entity state machines
//! - **Doctor**: one-shot checks and repairs
//!
//! # Architecture
//!
//! ```text
//!                  wsync-cli
//!                      |
//!                 wsync-core
//!     +--------+-------+--------+--------+
//!     |        |       |        |        |
//!  router   doctor   sync   buildinfo  registry
//!                      |
//!                  wsync-fs
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wsync_core::{EventRouter, FsWatcher, SyncContext, SyncOptions};
//!
//! async fn watch(root: &str) -> wsync_core::Result<()> {
//!     let ctx = Arc::new(SyncContext::new(root, SyncOptions::default())?);
//!     let router = EventRouter::new(Arc::clone(&ctx));
//!     let watcher = FsWatcher::new(ctx.root())?;
//!     router.start().await?;
//!     router.run(watcher, async { let _ = tokio::signal::ctrl_c().await; }).await
//! }
//! ```

pub mod buildinfo;
pub mod context;
pub mod discovery;
pub mod doctor;
pub mod document;
pub mod error;
pub mod registry;
pub mod router;
pub mod sync;

pub use buildinfo::BuildInfo;
pub use context::{SyncContext, SyncOptions};
pub use discovery::{expand_workspaces, matches_workspace};
pub use doctor::{CheckItem, CheckKind, CheckStatus, Doctor, DoctorOptions, DoctorReport};
pub use document::{DependencyField, Manifest, ProjectConfig};
pub use error::{Error, Result};
pub use registry::{ArtifactState, Readiness, WorkspaceRegistry};
pub use router::{EventRouter, FsEvent, FsEventKind, FsWatcher, Target};
pub use sync::{Change, ConfigSynchronizer, DependencyDiff, Patch};
