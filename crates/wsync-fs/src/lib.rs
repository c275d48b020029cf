//! Filesystem layer for wsync
//!
//! Provides root-relative path handling, the conventional file names of a
//! workspace, atomic JSON writes and a retrying reader for files that are
//! written non-atomically by other processes.

pub mod constants;
pub mod error;
pub mod io;
pub mod path;
pub mod retry;

pub use constants::WorkspaceFile;
pub use error::{Error, Result};
pub use path::NormalizedPath;
pub use retry::{RetryPolicy, read_json_retrying};
