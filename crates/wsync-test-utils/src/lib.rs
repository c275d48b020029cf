//! Shared test utilities for the wsync workspace.
//!
//! This crate provides standardised fixtures so every crate's test suite
//! builds monorepos the same way. It is a dev-dependency only and never
//! published.
//!
//! # Modules
//!
//! - [`artifact`]: [`BuildInfoBuilder`] for incremental build artifacts
//! - [`monorepo`]: [`TestMonorepo`] builder for on-disk workspaces

pub mod artifact;
pub mod monorepo;

pub use artifact::BuildInfoBuilder;
pub use monorepo::TestMonorepo;
