//! Built-in metrics for watcher activity.
//!
//! Provides OpenTelemetry metrics tracking:
//! - Listener notifications, by what detected the change
//! - Downgrades to polling mode
//! - Failed subscription attempts
//! - Panicking listeners
//!
//! # Examples
//!
//! ```rust,no_run
//! use config_file_watcher::prelude::*;
//! use opentelemetry::global;
//!
//! # fn example() -> Result<()> {
//! let meter = global::meter("my-app");
//!
//! let watcher = FileWatcher::builder("/etc/app/app.conf", || println!("changed"))
//!     .with_metrics(meter)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod watch_metrics;

pub use watch_metrics::WatchMetrics;
