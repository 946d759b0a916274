//! Builder for constructing FileWatcher instances.

use crate::core::{FileWatcher, WatchOptions};
use crate::error::Result;
use crate::notify::{ChangeNotifier, FileChangeListener, NotifyBackend, PollingOnly};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::Dispatch;

#[cfg(feature = "metrics")]
use crate::metrics::WatchMetrics;

/// Builder for constructing a [`FileWatcher`].
///
/// # Examples
///
/// ```rust,no_run
/// use config_file_watcher::prelude::*;
/// use std::time::Duration;
///
/// # fn example() -> Result<()> {
/// let watcher = FileWatcher::builder("/etc/app/app.conf", || println!("changed"))
///     .with_quiescence_timeout(Duration::from_secs(30))
///     .with_poll_interval(Duration::from_secs(2))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct FileWatcherBuilder {
    path: PathBuf,
    listener: Arc<dyn FileChangeListener>,
    options: WatchOptions,
    notifier: Arc<dyn ChangeNotifier>,
    dispatch: Option<Dispatch>,
    runtime: Option<Handle>,
    #[cfg(feature = "metrics")]
    metrics: Option<WatchMetrics>,
}

impl FileWatcherBuilder {
    pub(crate) fn new(path: PathBuf, listener: Arc<dyn FileChangeListener>) -> Self {
        Self {
            path,
            listener,
            options: WatchOptions::default(),
            notifier: Arc::new(NotifyBackend),
            dispatch: None,
            runtime: None,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Replace all timing options at once, e.g. with options loaded from a file.
    pub fn with_options(mut self, options: WatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Longest wait for OS events before the timestamp is compared directly.
    pub fn with_quiescence_timeout(mut self, timeout: Duration) -> Self {
        self.options.quiescence_timeout = timeout;
        self
    }

    /// Interval between timestamp checks in polling mode.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.options.poll_interval = interval;
        self
    }

    /// Pause before retrying a subscription that failed with a transient error.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.options.retry_delay = delay;
        self
    }

    /// Use a custom change-notification backend.
    pub fn with_notifier(mut self, notifier: impl ChangeNotifier) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    /// Skip OS notifications and poll the modification time from the start.
    pub fn with_polling_only(self) -> Self {
        self.with_notifier(PollingOnly)
    }

    /// Send the watcher's logs to this dispatcher.
    ///
    /// By default the dispatcher active when [`build`](Self::build) is called
    /// is captured, so the background task logs where the caller logs.
    pub fn with_dispatch(mut self, dispatch: impl Into<Dispatch>) -> Self {
        self.dispatch = Some(dispatch.into());
        self
    }

    /// Run the watch task on this runtime instead of the one current at `start()`.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Record watcher activity with OpenTelemetry.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, meter: opentelemetry::metrics::Meter) -> Self {
        self.metrics = Some(WatchMetrics::new(meter));
        self
    }

    /// Validate the path and options and create the watcher.
    ///
    /// No background task is started; call [`FileWatcher::start`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path is empty, has no file name, or its parent directory does not exist
    /// - A timing option is zero where it must be positive
    pub fn build(self) -> Result<FileWatcher> {
        self.options.validate()?;

        let dispatch = self
            .dispatch
            .unwrap_or_else(|| tracing::dispatcher::get_default(Dispatch::clone));

        FileWatcher::from_parts(
            self.path,
            self.listener,
            self.notifier,
            self.options,
            dispatch,
            self.runtime,
            #[cfg(feature = "metrics")]
            self.metrics,
        )
    }
}
