//! Error types for config-file-watcher.

use crate::core::WatcherState;

/// Result type alias for config-file-watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors returned to the caller of a [`FileWatcher`](crate::core::FileWatcher).
///
/// Conditions met by the background loop (missing OS support, transient I/O
/// failures while subscribing) are never surfaced here. The loop logs them and
/// carries on.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The watch target cannot be used (empty path, no file name, missing parent directory).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not allowed in the watcher's current state.
    #[error("Invalid watcher state: expected {expected}, found {actual}")]
    InvalidState {
        /// State the operation requires
        expected: WatcherState,
        /// State the watcher was actually in
        actual: WatcherState,
    },

    /// `start()` was called outside of a tokio runtime and no handle was supplied.
    #[error("No tokio runtime available to run the watch loop")]
    NoRuntime,

    /// Watch options could not be loaded or are out of range.
    #[error("Invalid watch options: {0}")]
    Options(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for WatchError {
    fn from(err: config::ConfigError) -> Self {
        WatchError::Options(err.to_string())
    }
}

/// Reasons a [`ChangeNotifier`](crate::notify::ChangeNotifier) could not subscribe.
///
/// The two variants drive different behaviour in the watch loop, so backends
/// must classify their failures explicitly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscribeError {
    /// The notification facility does not exist in this environment.
    /// The watcher switches to polling for the rest of its lifetime.
    #[error("change notifications unsupported: {0}")]
    Unsupported(String),

    /// A recoverable failure, e.g. the directory is temporarily unreadable.
    /// The watcher logs it and tries to subscribe again.
    #[error("failed to subscribe: {0}")]
    Io(String),
}
