//! Recursive filesystem watch delivering batches of [`FsEvent`]s

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::warn;
use wsync_fs::NormalizedPath;

use super::event::{FsEvent, convert_event};
use crate::Result;

/// One recursive watch over the project root.
///
/// Dropping the watcher unsubscribes from the OS; [`FsWatcher::next_batch`]
/// then drains what was already queued and returns `None`.
pub struct FsWatcher {
    watcher: Option<RecommendedWatcher>,
    receiver: mpsc::UnboundedReceiver<Vec<FsEvent>>,
}

impl FsWatcher {
    pub fn new(root: &NormalizedPath) -> Result<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let events = convert_event(event);
                if !events.is_empty() {
                    let _ = sender.send(events);
                }
            }
            Err(e) => warn!("watch error: {}", e),
        })?;
        watcher.watch(root.as_ref(), RecursiveMode::Recursive)?;

        Ok(Self {
            watcher: Some(watcher),
            receiver,
        })
    }

    /// Wait for the next batch: everything queued once the first event arrives.
    pub async fn next_batch(&mut self) -> Option<Vec<FsEvent>> {
        let mut batch = self.receiver.recv().await?;
        while let Ok(more) = self.receiver.try_recv() {
            batch.extend(more);
        }
        Some(batch)
    }

    /// Unsubscribe from the OS; queued events stay readable.
    pub fn unsubscribe(&mut self) {
        self.watcher.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::router::event::FsEventKind;

    #[tokio::test]
    async fn test_reports_created_files() {
        let temp = TempDir::new().unwrap();
        let root = NormalizedPath::new(temp.path()).canonicalize().unwrap();
        let mut watcher = FsWatcher::new(&root).unwrap();

        std::fs::write(temp.path().join("package.json"), "{}").unwrap();

        let expected = root.join("package.json");
        let found = tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(batch) = watcher.next_batch().await {
                if batch
                    .iter()
                    .any(|e| e.path == expected && e.kind != FsEventKind::Delete)
                {
                    return true;
                }
            }
            false
        })
        .await;
        assert_eq!(found.ok(), Some(true));
    }

    #[tokio::test]
    async fn test_unsubscribed_watcher_ends_stream() {
        let temp = TempDir::new().unwrap();
        let root = NormalizedPath::new(temp.path()).canonicalize().unwrap();
        let mut watcher = FsWatcher::new(&root).unwrap();
        watcher.unsubscribe();

        let next = tokio::time::timeout(Duration::from_secs(10), async {
            while watcher.next_batch().await.is_some() {}
        })
        .await;
        assert!(next.is_ok());
    }
}
