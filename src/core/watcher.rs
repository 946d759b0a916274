//! The file watcher handle.

use crate::core::modified::ModifiedTracker;
use crate::core::state::StateCell;
use crate::core::watch_loop::WatchLoop;
use crate::core::{FileWatcherBuilder, WatchOptions, WatcherState};
use crate::error::{Result, WatchError};
use crate::notify::{ChangeNotifier, FileChangeListener};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument, debug, error, info_span};

#[cfg(feature = "metrics")]
use crate::metrics::WatchMetrics;

/// Watches one file and calls a listener whenever it is modified.
///
/// The watcher subscribes to OS change notifications for the file's parent
/// directory and filters them by file name. Every quiescence timeout (10s by
/// default) it also compares the file's modification time, which catches
/// changes the OS did not report. Where notifications are unavailable it
/// falls back to polling the modification time (every 5s by default).
///
/// # Examples
///
/// ```rust,no_run
/// use config_file_watcher::prelude::*;
///
/// # async fn example() -> Result<()> {
/// let watcher = FileWatcher::new("/etc/app/app.conf", || {
///     println!("Config file changed, reload triggered!");
/// })?;
/// watcher.start()?;
///
/// // ... later
/// watcher.stop();
/// watcher.join().await;
/// # Ok(())
/// # }
/// ```
pub struct FileWatcher {
    path: PathBuf,
    dir: PathBuf,
    file_name: OsString,
    listener: Arc<dyn FileChangeListener>,
    notifier: Arc<dyn ChangeNotifier>,
    options: WatchOptions,
    dispatch: Dispatch,
    runtime: Option<Handle>,
    state: Arc<StateCell>,
    cancel: CancellationToken,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    #[cfg(feature = "metrics")]
    metrics: Option<WatchMetrics>,
}

/// Marks the watcher stopped when the background task ends, however it ends.
struct MarkStopped(Arc<StateCell>);

impl Drop for MarkStopped {
    fn drop(&mut self) {
        self.0.set(WatcherState::Stopped);
    }
}

impl FileWatcher {
    /// Create a watcher with default options.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidArgument`] if the path is empty, has no
    /// file name, or its parent directory does not exist.
    pub fn new(path: impl Into<PathBuf>, listener: impl FileChangeListener) -> Result<Self> {
        Self::builder(path, listener).build()
    }

    /// Create a builder to customise timings, backend, logging or runtime.
    pub fn builder(
        path: impl Into<PathBuf>,
        listener: impl FileChangeListener,
    ) -> FileWatcherBuilder {
        FileWatcherBuilder::new(path.into(), Arc::new(listener))
    }

    pub(crate) fn from_parts(
        path: PathBuf,
        listener: Arc<dyn FileChangeListener>,
        notifier: Arc<dyn ChangeNotifier>,
        options: WatchOptions,
        dispatch: Dispatch,
        runtime: Option<Handle>,
        #[cfg(feature = "metrics")] metrics: Option<WatchMetrics>,
    ) -> Result<Self> {
        let (path, dir, file_name) = resolve_target(&path)?;
        Ok(Self {
            path,
            dir,
            file_name,
            listener,
            notifier,
            options,
            dispatch,
            runtime,
            state: Arc::new(StateCell::new()),
            cancel: CancellationToken::new(),
            task: parking_lot::Mutex::new(None),
            #[cfg(feature = "metrics")]
            metrics,
        })
    }

    /// Start the background watch task.
    ///
    /// The task runs on the runtime given to the builder, or on the current
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`WatchError::InvalidState`] if the watcher was already started.
    /// - [`WatchError::NoRuntime`] if no tokio runtime is available. The
    ///   watcher stays idle and may be started again later.
    pub fn start(&self) -> Result<()> {
        let runtime = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|_| WatchError::NoRuntime)?,
        };

        self.state
            .transition(WatcherState::Idle, WatcherState::Running)
            .map_err(|actual| WatchError::InvalidState {
                expected: WatcherState::Idle,
                actual,
            })?;

        // Record the baseline now, not when the task is first polled.
        let tracker = ModifiedTracker::new(&self.path);
        let watch = WatchLoop {
            dir: self.dir.clone(),
            file_name: self.file_name.clone(),
            listener: Arc::clone(&self.listener),
            notifier: Arc::clone(&self.notifier),
            options: self.options,
            cancel: self.cancel.clone(),
            #[cfg(feature = "metrics")]
            metrics: self.metrics.clone(),
        };

        let span = tracing::dispatcher::with_default(&self.dispatch, || {
            info_span!("file_watcher", path = %self.path.display())
        });
        let stopped = MarkStopped(Arc::clone(&self.state));
        let task = async move {
            let _stopped = stopped;
            watch.run(tracker).await;
        };

        let handle = runtime.spawn(task.instrument(span).with_subscriber(self.dispatch.clone()));
        *self.task.lock() = Some(handle);
        Ok(())
    }

    /// Request the background task to stop.
    ///
    /// Returns immediately; use [`join`](Self::join) to wait for the task to
    /// exit. Once the task observes the request it makes no further listener
    /// calls. Calling this on an idle or stopped watcher does nothing.
    pub fn stop(&self) {
        if self.state.get() == WatcherState::Running {
            tracing::dispatcher::with_default(&self.dispatch, || {
                debug!(path = %self.path.display(), "Stop requested");
            });
            self.cancel.cancel();
        }
    }

    /// Wait until the background task has exited.
    ///
    /// Returns immediately if the watcher was never started or was already joined.
    pub async fn join(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    tracing::dispatcher::with_default(&self.dispatch, || {
                        error!(path = %self.path.display(), "Watch task panicked");
                    });
                }
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WatcherState {
        self.state.get()
    }

    /// Whether the background task is active.
    pub fn is_running(&self) -> bool {
        self.state() == WatcherState::Running
    }

    /// Absolute path of the watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Timing options in effect.
    pub fn options(&self) -> &WatchOptions {
        &self.options
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Validate the watch target and split it into (absolute path, parent directory, file name).
fn resolve_target(path: &Path) -> Result<(PathBuf, PathBuf, OsString)> {
    if path.as_os_str().is_empty() {
        return Err(WatchError::InvalidArgument("watch path is empty".to_string()));
    }

    let absolute = std::path::absolute(path).map_err(|e| {
        WatchError::InvalidArgument(format!("cannot resolve {}: {}", path.display(), e))
    })?;

    let file_name = absolute.file_name().map(|n| n.to_os_string()).ok_or_else(|| {
        WatchError::InvalidArgument(format!("{} has no file name", absolute.display()))
    })?;

    let dir = absolute
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            WatchError::InvalidArgument(format!(
                "{} has no parent directory",
                absolute.display()
            ))
        })?;

    if !dir.is_dir() {
        return Err(WatchError::InvalidArgument(format!(
            "parent directory {} does not exist",
            dir.display()
        )));
    }

    Ok((absolute, dir, file_name))
}
