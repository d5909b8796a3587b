use crate::api::AccountApi;
use crate::changes::ChangeLog;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

/// Delay between the last edit and the flush it triggers.
pub const SYNC_DEBOUNCE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSignal {
    Touch,
    Stop,
}

/// Trailing-edge debounce around `ChangeLog::flush`. Every touch pushes the
/// deadline out by the full delay, so a burst of edits collapses into one
/// network call. Stopping discards any pending deadline without flushing;
/// the session teardown performs the final flush itself so that exactly one
/// flush carries the remaining edits.
pub struct SyncScheduler {
    signal_tx: mpsc::UnboundedSender<SyncSignal>,
    handle: JoinHandle<()>,
}

impl SyncScheduler {
    pub fn spawn(api: Arc<dyn AccountApi>, delay: Duration) -> (Arc<ChangeLog>, SyncScheduler) {
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
        let changes = Arc::new(ChangeLog::new(api, signal_tx.clone()));

        let flusher = changes.clone();
        let handle = tokio::spawn(async move {
            let mut deadline: Option<Instant> = None;
            loop {
                let wait = async {
                    match deadline {
                        Some(at) => time::sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                };
                tokio::select! {
                    signal = signal_rx.recv() => match signal {
                        Some(SyncSignal::Touch) => deadline = Some(Instant::now() + delay),
                        Some(SyncSignal::Stop) | None => break,
                    },
                    () = wait => {
                        deadline = None;
                        if let Err(e) = flusher.flush().await {
                            // fire and forget: the edits are gone, nothing to retry
                            warn!("change sync failed: {:#}", e);
                        }
                    }
                }
            }
            debug!("sync scheduler stopped");
        });

        (changes, SyncScheduler { signal_tx, handle })
    }

    /// Stops the debounce loop. Any armed deadline is dropped unfired; the
    /// caller owns the final flush.
    pub async fn stop(self) {
        let _ = self.signal_tx.send(SyncSignal::Stop);
        if let Err(e) = self.handle.await {
            warn!("sync scheduler task failed: {}", e);
        }
    }
}
