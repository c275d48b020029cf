//! Filesystem event routing
//!
//! Raw watch events are classified by path and handed to one of three
//! state machines: the root manifest, a workspace (manifest and config
//! presence) or a workspace's build artifact. Each event runs as its own
//! task; handlers lock the registry only between suspension points.

mod artifact;
pub mod event;
mod root;
mod watch;
pub(crate) mod workspace;

use std::future::Future;
use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};
use wsync_fs::WorkspaceFile;

pub use event::{FsEvent, FsEventKind, Target, classify, convert_event};
pub use watch::FsWatcher;

use crate::context::SyncContext;
use crate::{Error, Result};

/// Routes filesystem events to the synchronization state machines.
#[derive(Debug, Clone)]
pub struct EventRouter {
    ctx: Arc<SyncContext>,
}

impl EventRouter {
    pub fn new(ctx: Arc<SyncContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<SyncContext> {
        &self.ctx
    }

    /// Handle a single event to completion.
    pub async fn handle(&self, event: FsEvent) -> Result<()> {
        dispatch(&self.ctx, event).await
    }

    /// Build the registry from disk by replaying a root manifest creation.
    pub async fn start(&self) -> Result<()> {
        let manifest = self.ctx.root_file(WorkspaceFile::Manifest);
        if manifest.is_file() {
            self.handle(FsEvent::new(FsEventKind::Create, manifest)).await
        } else {
            info!(root = %self.ctx.root(), "no root manifest, waiting for one");
            Ok(())
        }
    }

    /// Route batches from `watcher` until `shutdown` resolves or a handler
    /// fails fatally.
    ///
    /// On shutdown the watch is dropped first, then in-flight handlers are
    /// awaited. Non-fatal handler errors are logged and dropped.
    pub async fn run(
        &self,
        mut watcher: FsWatcher,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        let mut tasks: JoinSet<Result<()>> = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutting down");
                    break;
                }
                batch = watcher.next_batch() => match batch {
                    Some(batch) => {
                        debug!(events = batch.len(), "received batch");
                        for event in batch {
                            let ctx = Arc::clone(&self.ctx);
                            tasks.spawn(async move { dispatch(&ctx, event).await });
                        }
                    }
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => settle(joined)?,
            }
        }

        watcher.unsubscribe();
        while let Some(joined) = tasks.join_next().await {
            settle(joined)?;
        }
        Ok(())
    }
}

async fn dispatch(ctx: &SyncContext, event: FsEvent) -> Result<()> {
    let Some(relative) = ctx.relative(&event.path) else {
        return Ok(());
    };
    let target = classify(&ctx.registry(), &relative);
    match target {
        Target::RootManifest => root::on_root_manifest(ctx, event.kind).await,
        Target::WorkspaceManifest(workspace) => {
            workspace::on_manifest(ctx, &workspace, event.kind).await
        }
        Target::WorkspaceConfig(workspace) => {
            workspace::on_config(ctx, &workspace, event.kind).await
        }
        Target::BuildInfo(workspace) => {
            artifact::on_build_info(ctx, &workspace, event.kind).await
        }
        Target::Ignored => root::on_unwatched_file(ctx, &relative, event.kind).await,
    }
}

fn settle(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) if e.is_fatal() => {
            error!("{}", e);
            Err(e)
        }
        Ok(Err(e)) => {
            warn!("{}", e);
            Ok(())
        }
        Err(e) => {
            error!("event handler aborted: {}", e);
            Err(Error::HandlerAborted(e.to_string()))
        }
    }
}
