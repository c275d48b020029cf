//! Configuration synchronization
//!
//! Diffs declared against discovered dependencies and rewrites workspace
//! configs, the root config and manifests so they agree.

mod diff;
mod engine;
mod notice;

pub use diff::{
    Change, DependencyDiff, Patch, ReferenceTarget, dependency_patch, reference_patch,
    rename_patch, root_reference_patch, settings_patch,
};
pub use engine::ConfigSynchronizer;
pub use notice::unified_diff;
