// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{PipelineError, Result};
use crate::notifier::NotifierEvent;
use crate::watch::patterns::{relative_str, WatchBinding};

/// Handle for a running filesystem subscription.
///
/// Keeps the underlying `RecommendedWatcher` alive. [`WatcherHandle::stop`]
/// (or dropping the handle) ends the subscription.
pub struct WatcherHandle {
    inner: Option<RecommendedWatcher>,
    forward: JoinHandle<()>,
    degraded: Arc<AtomicBool>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("degraded", &self.is_degraded())
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    /// The backend reported an error since startup; changes may be missed.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    pub fn stop(mut self) {
        self.inner.take();
        self.forward.abort();
        info!("file watcher stopped");
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.forward.abort();
    }
}

/// Watch `root` recursively and send `NotifierEvent::Changed` for every
/// binding whose watch glob matches a changed path.
///
/// - `root` is the project root; globs are matched against paths relative to
///   it.
/// - Access-only events are ignored.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    bindings: Vec<WatchBinding>,
    notifier_tx: mpsc::Sender<NotifierEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    let degraded = Arc::new(AtomicBool::new(false));
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        {
            let degraded = Arc::clone(&degraded);
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event_tx.send(event).is_err() {
                        debug!("watcher event loop gone; dropping notify event");
                    }
                }
                Err(err) => {
                    degraded.store(true, Ordering::Relaxed);
                    warn!(error = %err, "file watch error; changes may be missed");
                }
            }
        },
        Config::default(),
    )
    .map_err(|e| PipelineError::Watch(e.to_string()))?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| PipelineError::Watch(format!("watching {root:?}: {e}")))?;

    info!(
        root = ?root,
        patterns = ?bindings.iter().map(|b| b.pattern()).collect::<Vec<_>>(),
        "file watcher started"
    );

    let forward = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            debug!(?event, "received notify event");

            for path in &event.paths {
                let Some(rel) = relative_str(&root, path) else {
                    continue;
                };
                for binding in bindings.iter().filter(|b| b.matches(&rel)) {
                    let change = NotifierEvent::Changed {
                        task: binding.task().to_string(),
                    };
                    if notifier_tx.send(change).await.is_err() {
                        debug!("notifier closed; watcher event loop finished");
                        return;
                    }
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        inner: Some(watcher),
        forward,
        degraded,
    })
}
