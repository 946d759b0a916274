//! Watcher lifecycle state.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a [`FileWatcher`](crate::core::FileWatcher).
///
/// A watcher only moves forward: `Idle` → `Running` → `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatcherState {
    /// Constructed, not started.
    Idle,
    /// The background task is active, in notification or polling mode.
    Running,
    /// The background task has exited.
    Stopped,
}

impl WatcherState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::Stopped => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Atomic cell shared between the watcher handle and its background task.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(WatcherState::Idle.as_u8()))
    }

    pub(crate) fn get(&self) -> WatcherState {
        WatcherState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: WatcherState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }

    /// Move from `from` to `to`, returning the observed state on failure.
    pub(crate) fn transition(
        &self,
        from: WatcherState,
        to: WatcherState,
    ) -> std::result::Result<(), WatcherState> {
        self.0
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(WatcherState::from_u8)
    }
}
