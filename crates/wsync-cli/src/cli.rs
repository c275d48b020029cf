//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// wsync - keep workspace references and dependencies in sync with the compiler
#[derive(Parser, Debug)]
#[command(name = "wsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Report workspace dependencies the compiler no longer sees in use
    #[arg(long, global = true)]
    pub redundant: bool,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true, env = "WSYNC_ROOT")]
    pub root: Option<PathBuf>,

    /// The command to run (defaults to `watch`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Watch the project and keep configs in sync until interrupted
    Watch,

    /// Check every workspace once and report problems
    ///
    /// Examples:
    ///   wsync doctor                      # Report only
    ///   wsync doctor --fix                # Repair configs and add missing dependencies
    ///   wsync doctor --fix --redundant    # Also remove unused workspace dependencies
    ///   wsync doctor --delete             # Remove empty workspace directories
    Doctor {
        /// Repair what can be repaired
        #[arg(long)]
        fix: bool,

        /// Remove empty workspace directories
        #[arg(long)]
        delete: bool,
    },
}
