//! wsync CLI
//!
//! Keeps a multi-package workspace's compiler project references and
//! workspace dependencies in sync with what the compiler actually uses.

mod cli;
mod commands;
mod error;

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::{CliError, Result};
use wsync_core::{DoctorOptions, SyncOptions};

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(cli.verbose)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("Verbose mode enabled");

    let root = resolve_root(cli.root)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => {
            let options = SyncOptions {
                report_redundant: cli.redundant,
                ..SyncOptions::default()
            };
            runtime.block_on(commands::run_watch(&root, options))?;
            Ok(0)
        }
        Commands::Doctor { fix, delete } => {
            let options = SyncOptions {
                report_redundant: cli.redundant,
                remove_redundant: fix && cli.redundant,
                ..SyncOptions::default()
            };
            let doctor = DoctorOptions {
                fix,
                delete,
                redundant: cli.redundant,
            };
            runtime.block_on(commands::run_doctor(&root, options, doctor))
        }
    }
}

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    let root = match root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    if !root.is_dir() {
        return Err(CliError::user(format!(
            "project root is not a directory: {}",
            root.display()
        )));
    }
    Ok(root)
}
