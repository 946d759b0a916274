//! Last-known modification timestamp of the watch target.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Tracks the modification time of one file.
///
/// A missing or unreadable file is recorded as `None`, so deleting and
/// recreating the file both count as changes.
#[derive(Debug)]
pub(crate) struct ModifiedTracker {
    path: PathBuf,
    last_known: Option<SystemTime>,
}

impl ModifiedTracker {
    /// Start tracking `path`, recording its current modification time.
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_known = modified_time(&path);
        Self { path, last_known }
    }

    /// Compare the file's modification time against the last-known value.
    ///
    /// Returns `true` and records the new value when they differ.
    pub(crate) fn check(&mut self) -> bool {
        let current = modified_time(&self.path);
        if current != self.last_known {
            self.last_known = current;
            true
        } else {
            false
        }
    }

    /// Record the current modification time without reporting a change.
    pub(crate) fn refresh(&mut self) {
        self.last_known = modified_time(&self.path);
    }

    #[cfg(test)]
    pub(crate) fn last_known(&self) -> Option<SystemTime> {
        self.last_known
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
