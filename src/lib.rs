//! # config-file-watcher
//!
//! Watch a single configuration file and get a callback when it changes.
//!
//! ## Overview
//!
//! `config-file-watcher` runs one background task per watched file:
//! - OS change notifications (inotify, kqueue, ReadDirectoryChangesW via `notify`)
//!   on the file's parent directory, filtered by file name
//! - A periodic modification-time re-check that catches changes the OS
//!   did not report
//! - An automatic fallback to polling where notifications are unavailable
//! - Prompt, non-blocking cancellation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use config_file_watcher::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let watcher = FileWatcher::new("config/app.yaml", || {
//!     println!("config/app.yaml changed");
//! })?;
//! watcher.start()?;
//!
//! // ... run the application ...
//!
//! watcher.stop();
//! watcher.join().await;
//! # Ok(())
//! # }
//! ```
//!
//! Listeners may be called more than once for a burst of writes. Reload
//! logic behind a listener should be idempotent.
//!
//! ## Feature Flags
//!
//! - `metrics`: OpenTelemetry counters for notifications, fallbacks and failures

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{FileWatcher, FileWatcherBuilder, WatchOptions, WatcherState};
    pub use crate::error::{Result, WatchError};
    pub use crate::notify::FileChangeListener;
}
