//! Listener invoked when the watched file changes.

/// Receives change notifications from a [`FileWatcher`](crate::core::FileWatcher).
///
/// Calls are made on the watcher's background task. A burst of writes may
/// produce several calls, so implementations should be idempotent or debounce
/// on their own.
///
/// On a multi-thread runtime the call runs under
/// [`tokio::task::block_in_place`], so a slow listener does not hold up other
/// tasks on that worker. A current-thread runtime has no spare worker: a
/// listener that blocks there stalls the whole runtime, so it should hand
/// long work to [`tokio::task::spawn_blocking`].
///
/// Any `Fn()` closure that is `Send + Sync` is a listener:
///
/// ```rust
/// use config_file_watcher::notify::FileChangeListener;
///
/// let listener = || println!("config changed");
/// listener.file_changed();
/// ```
pub trait FileChangeListener: Send + Sync + 'static {
    /// Called once per detected change.
    fn file_changed(&self);
}

impl<F> FileChangeListener for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn file_changed(&self) {
        self()
    }
}
