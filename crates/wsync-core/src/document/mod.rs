//! Typed views over the JSON documents wsync reads and rewrites.

mod manifest;
mod project_config;

pub use manifest::{DependencyField, Manifest, WILDCARD_VERSION};
pub use project_config::{ProjectConfig, workspace_settings};
