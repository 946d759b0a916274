//! The background watch loop.

use crate::core::WatchOptions;
use crate::core::modified::ModifiedTracker;
use crate::error::SubscribeError;
use crate::notify::{ChangeNotifier, FileChangeListener};
use std::ffi::OsString;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;
use tokio::task;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[cfg(feature = "metrics")]
use crate::metrics::WatchMetrics;

/// What detected a change to the watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTrigger {
    /// An OS modification event named the file.
    Event,
    /// The timestamp differed when the quiescence timeout expired.
    Recheck,
    /// The timestamp differed on a polling tick.
    Poll,
}

impl ChangeTrigger {
    /// Short label used in logs and metric attributes.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Recheck => "recheck",
            Self::Poll => "poll",
        }
    }
}

/// How notification mode ended.
#[derive(Debug, PartialEq, Eq)]
enum Exit {
    Cancelled,
    Fallback,
}

/// How one subscription ended.
enum SubscriptionEnd {
    Cancelled,
    Resubscribe,
}

/// Everything the background task needs, moved into it by `start()`.
pub(crate) struct WatchLoop {
    pub(crate) dir: PathBuf,
    pub(crate) file_name: OsString,
    pub(crate) listener: Arc<dyn FileChangeListener>,
    pub(crate) notifier: Arc<dyn ChangeNotifier>,
    pub(crate) options: WatchOptions,
    pub(crate) cancel: CancellationToken,
    #[cfg(feature = "metrics")]
    pub(crate) metrics: Option<WatchMetrics>,
}

impl WatchLoop {
    /// Run until cancelled.
    ///
    /// `tracker` must be created before the task is spawned, so a write made
    /// right after `start()` differs from the recorded baseline.
    pub(crate) async fn run(self, mut tracker: ModifiedTracker) {
        info!(
            quiescence_timeout = ?self.options.quiescence_timeout,
            poll_interval = ?self.options.poll_interval,
            "Started to watch file"
        );

        if self.watch_notifications(&mut tracker).await == Exit::Fallback {
            self.watch_polling(&mut tracker).await;
        }

        info!("File watch interrupted");
    }

    async fn watch_notifications(&self, tracker: &mut ModifiedTracker) -> Exit {
        if !self.notifier.is_supported() {
            warn!("Change notifications are not supported here, falling back to polling");
            self.record_fallback();
            return Exit::Fallback;
        }

        while !self.cancel.is_cancelled() {
            let (tx, rx) = mpsc::unbounded_channel();
            match self.notifier.subscribe(&self.dir, tx) {
                Ok(subscription) => {
                    debug!(dir = %self.dir.display(), "Subscribed to directory changes");
                    let end = self.receive_events(tracker, rx).await;
                    drop(subscription);
                    if let SubscriptionEnd::Cancelled = end {
                        return Exit::Cancelled;
                    }
                }
                Err(SubscribeError::Unsupported(reason)) => {
                    warn!(%reason, "Cannot use change notifications, falling back to polling");
                    self.record_fallback();
                    return Exit::Fallback;
                }
                Err(SubscribeError::Io(reason)) => {
                    error!(dir = %self.dir.display(), %reason, "Can't watch file, retrying");
                    #[cfg(feature = "metrics")]
                    if let Some(metrics) = &self.metrics {
                        metrics.record_subscribe_error();
                    }
                    if !self.pause(self.options.retry_delay).await {
                        return Exit::Cancelled;
                    }
                }
            }
        }

        Exit::Cancelled
    }

    async fn receive_events(
        &self,
        tracker: &mut ModifiedTracker,
        mut rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    ) -> SubscriptionEnd {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return SubscriptionEnd::Cancelled,
                received = timeout(self.options.quiescence_timeout, rx.recv()) => match received {
                    Err(_elapsed) => {
                        if !self.recheck(tracker, ChangeTrigger::Recheck) {
                            return SubscriptionEnd::Cancelled;
                        }
                    }
                    Ok(None) => {
                        warn!("Change notification channel closed, resubscribing");
                        return SubscriptionEnd::Resubscribe;
                    }
                    Ok(Some(first)) => {
                        let mut batch = vec![first];
                        while let Ok(more) = rx.try_recv() {
                            batch.push(more);
                        }
                        let mut broken = false;
                        for item in batch {
                            match item {
                                Ok(event) if self.is_target_event(&event) => {
                                    tracker.refresh();
                                    if !self.notify(ChangeTrigger::Event) {
                                        return SubscriptionEnd::Cancelled;
                                    }
                                }
                                Ok(_) => {}
                                Err(err) => {
                                    warn!(error = %err, "Change notification error");
                                    broken = true;
                                }
                            }
                        }
                        if broken {
                            return SubscriptionEnd::Resubscribe;
                        }
                    }
                }
            }
        }
    }

    async fn watch_polling(&self, tracker: &mut ModifiedTracker) {
        info!("Started to watch file with polling fallback");
        while self.pause(self.options.poll_interval).await {
            if !self.recheck(tracker, ChangeTrigger::Poll) {
                return;
            }
        }
    }

    /// Compare timestamps and notify on change. Returns `false` once cancelled.
    fn recheck(&self, tracker: &mut ModifiedTracker, trigger: ChangeTrigger) -> bool {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.update_since_change();
        }
        if tracker.check() {
            return self.notify(trigger);
        }
        !self.cancel.is_cancelled()
    }

    fn is_target_event(&self, event: &notify::Event) -> bool {
        event.kind.is_modify()
            && event
                .paths
                .iter()
                .any(|path| path.file_name() == Some(self.file_name.as_os_str()))
    }

    /// Invoke the listener unless cancellation was requested.
    ///
    /// Returns `false` when cancelled; the listener is not called then.
    fn notify(&self, trigger: ChangeTrigger) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }

        debug!(trigger = trigger.as_str(), "File changed, notifying listener");
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_notification(trigger);
        }

        let listener = &self.listener;
        let call = || listener.file_changed();
        // Keep a blocking listener from stalling other tasks on this worker.
        let outcome = match Handle::try_current().map(|handle| handle.runtime_flavor()) {
            Ok(RuntimeFlavor::MultiThread) => {
                panic::catch_unwind(AssertUnwindSafe(|| task::block_in_place(call)))
            }
            _ => panic::catch_unwind(AssertUnwindSafe(call)),
        };
        if outcome.is_err() {
            error!(trigger = trigger.as_str(), "Listener panicked while handling a file change");
            #[cfg(feature = "metrics")]
            if let Some(metrics) = &self.metrics {
                metrics.record_listener_panic();
            }
        }
        true
    }

    /// Sleep for `duration`. Returns `false` if cancelled first.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = sleep(duration) => true,
        }
    }

    fn record_fallback(&self) {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_fallback();
        }
    }
}
