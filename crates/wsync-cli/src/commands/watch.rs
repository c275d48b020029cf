//! Watch command implementation
//!
//! Rebuilds the registry from disk, then routes filesystem events until
//! interrupted.

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use tracing::info;

use wsync_core::{EventRouter, FsWatcher, SyncContext, SyncOptions};

use crate::error::Result;

/// Run the watch command
///
/// Returns when ctrl-c is received (after in-flight handlers finish) or
/// when a handler fails fatally.
pub async fn run_watch(path: &Path, options: SyncOptions) -> Result<()> {
    let ctx = Arc::new(SyncContext::new(path, options)?);
    println!(
        "{} Watching {}",
        "=>".blue().bold(),
        ctx.root().as_str().cyan()
    );

    // Subscribe before the initial scan so nothing written during it is missed.
    let watcher = FsWatcher::new(ctx.root())?;
    let router = EventRouter::new(Arc::clone(&ctx));
    router.start().await?;
    info!("initial synchronization complete");

    router
        .run(watcher, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("cannot listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    println!("{} Stopped.", "OK".green().bold());
    Ok(())
}
