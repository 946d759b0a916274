//! Core watcher types.

mod builder;
mod modified;
mod options;
mod state;
mod watch_loop;
mod watcher;

pub use builder::FileWatcherBuilder;
pub use options::{
    DEFAULT_POLL_INTERVAL, DEFAULT_QUIESCENCE_TIMEOUT, DEFAULT_RETRY_DELAY, WatchOptions,
};
pub use state::WatcherState;
pub use watch_loop::ChangeTrigger;
pub use watcher::FileWatcher;
