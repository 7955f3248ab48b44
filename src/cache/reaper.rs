//! Periodic expiry sweep
//!
//! Lazy expiry on `get` only removes entries that are asked for again; the
//! reaper bounds how long abandoned entries keep occupying shard capacity.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::ShardedCache;

/// Handle to a running reaper task. Dropping it cancels the task; call
/// [`ReaperHandle::shutdown`] to also wait for it to finish.
pub struct ReaperHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ReaperHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the sweep loop and wait for it to exit
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Cache reaper ended abnormally: {}", e);
            }
        }
        debug!("Cache reaper stopped");
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl ShardedCache {
    /// Spawn a task that calls [`ShardedCache::remove_expired`] every `interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_background_expiry(self: &Arc<Self>, interval: Duration) -> ReaperHandle {
        let cache = Arc::clone(self);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = cache.remove_expired();
                        if removed > 0 {
                            debug!("Cache reaper removed {} expired entries", removed);
                        }
                    }
                }
            }
        });

        debug!("Cache reaper started (every {:?})", period);
        ReaperHandle {
            cancel,
            task: Some(task),
        }
    }
}
