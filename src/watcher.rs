//! Event coalescing: raw file-change notifications → batched index work.
//!
//! Editors save in bursts — atomic-write temp files, double saves,
//! metadata touches. Re-tokenizing a note on every notification wastes
//! work, so create/modify events land in a pending set and a single quiet
//! timer is re-armed on each arrival; when it fires, everything pending is
//! upserted at once. Deletions and renames can't wait (a query between
//! the event and the flush would surface a ghost note), so they dispatch
//! immediately.

use crate::vault::VaultIndexer;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A change to one source file, addressed by vault-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    Created(String),
    Modified(String),
    Deleted(String),
    Renamed { from: String, to: String },
}

/// Debounces create/modify events into batched upserts.
pub struct EventCoalescer {
    indexer: Arc<VaultIndexer>,
    quiet: Duration,
}

impl EventCoalescer {
    pub fn new(indexer: Arc<VaultIndexer>, quiet: Duration) -> Self {
        Self { indexer, quiet }
    }

    /// Consume events until the sender side hangs up. On teardown the
    /// timer is cancelled and the pending set is cleared.
    pub async fn run(self, mut events: UnboundedReceiver<VaultEvent>) {
        let mut pending: HashSet<String> = HashSet::new();
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(VaultEvent::Created(path)) | Some(VaultEvent::Modified(path)) => {
                            pending.insert(path);
                            deadline = Some(Instant::now() + self.quiet);
                        }
                        Some(VaultEvent::Deleted(path)) => {
                            pending.remove(&path);
                            if pending.is_empty() {
                                deadline = None;
                            }
                            self.indexer.remove(&path).await;
                        }
                        Some(VaultEvent::Renamed { from, to }) => {
                            pending.remove(&from);
                            pending.insert(to.clone());
                            deadline = Some(Instant::now() + self.quiet);
                            if let Err(err) = self.indexer.rename(&from, &to).await {
                                warn!(%from, %to, %err, "rename dispatch failed");
                            }
                        }
                        None => {
                            pending.clear();
                            return;
                        }
                    }
                }
                _ = sleep_until_or_forever(deadline), if deadline.is_some() => {
                    deadline = None;
                    let batch: Vec<String> = pending.drain().collect();
                    debug!(count = batch.len(), "flushing coalesced changes");

                    let mut tasks = JoinSet::new();
                    for path in batch {
                        let indexer = Arc::clone(&self.indexer);
                        tasks.spawn(async move {
                            if let Err(err) = indexer.upsert_if_changed(&path).await {
                                warn!(%path, %err, "coalesced upsert failed");
                            }
                        });
                    }
                    while tasks.join_next().await.is_some() {}
                }
            }
        }
    }
}

async fn sleep_until_or_forever(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Bridges raw `notify` filesystem events into [`VaultEvent`]s.
///
/// Kept alive by ownership: dropping it stops the watch, closing the
/// channel, which in turn winds down the coalescer.
pub struct VaultWatcher {
    _watcher: notify::RecommendedWatcher,
}

impl VaultWatcher {
    pub fn new(
        root: &Path,
        events: UnboundedSender<VaultEvent>,
    ) -> Result<Self, notify::Error> {
        let base = root.to_path_buf();
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(err) => {
                        warn!(%err, "file watch error");
                        return;
                    }
                };
                for converted in convert(&base, &event) {
                    // Receiver gone means shutdown; nothing to do
                    let _ = events.send(converted);
                }
            })?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(Self { _watcher: watcher })
    }
}

/// Translate one notify event into vault events, dropping non-markdown
/// paths.
fn convert(base: &Path, event: &notify::Event) -> Vec<VaultEvent> {
    let ids: Vec<String> = event
        .paths
        .iter()
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("md") | Some("markdown")
            )
        })
        .map(|path| relative_id(base, path))
        .collect();
    if ids.is_empty() {
        return Vec::new();
    }

    match event.kind {
        EventKind::Create(_) => ids.into_iter().map(VaultEvent::Created).collect(),
        EventKind::Remove(_) => ids.into_iter().map(VaultEvent::Deleted).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if ids.len() == 2 => {
            let mut ids = ids;
            let to = ids.pop().expect("len checked");
            let from = ids.pop().expect("len checked");
            vec![VaultEvent::Renamed { from, to }]
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            ids.into_iter().map(VaultEvent::Deleted).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            ids.into_iter().map(VaultEvent::Created).collect()
        }
        EventKind::Modify(_) => ids.into_iter().map(VaultEvent::Modified).collect(),
        _ => Vec::new(),
    }
}

fn relative_id(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
