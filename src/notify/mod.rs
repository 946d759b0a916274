//! Change notification plumbing.
//!
//! [`ChangeNotifier`] abstracts the OS facility that reports directory changes,
//! and [`FileChangeListener`] is what the watcher calls when the target changes.

pub mod backend;
pub mod listener;

pub use backend::{ChangeNotifier, EventSender, NotifyBackend, PollingOnly, Subscription};
pub use listener::FileChangeListener;
