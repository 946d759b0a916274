//! OS change-notification backends.

use crate::error::SubscribeError;
use notify::{RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher, WatcherKind};
use std::any::Any;
use std::path::Path;
use tokio::sync::mpsc;

/// Channel the backend pushes raw directory events into.
pub type EventSender = mpsc::UnboundedSender<notify::Result<notify::Event>>;

/// An active directory subscription.
///
/// Dropping it releases the underlying OS handle.
pub struct Subscription {
    _guard: Box<dyn Any + Send>,
}

impl Subscription {
    /// Wrap whatever keeps the subscription alive (typically a `notify` watcher).
    pub fn new(guard: impl Any + Send) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

/// Source of directory change notifications.
///
/// Implementations report explicitly whether notifications are available,
/// and classify subscription failures as permanent
/// ([`SubscribeError::Unsupported`]) or transient ([`SubscribeError::Io`]).
pub trait ChangeNotifier: Send + Sync + 'static {
    /// Whether this environment can deliver push notifications at all.
    fn is_supported(&self) -> bool;

    /// Subscribe to changes of the entries directly inside `dir`.
    ///
    /// Events are sent to `events` until the returned [`Subscription`] is dropped.
    fn subscribe(
        &self,
        dir: &Path,
        events: EventSender,
    ) -> std::result::Result<Subscription, SubscribeError>;
}

/// Backend using the platform's recommended `notify` watcher
/// (inotify, kqueue, ReadDirectoryChangesW).
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyBackend;

impl ChangeNotifier for NotifyBackend {
    fn is_supported(&self) -> bool {
        // notify substitutes its own poller on platforms without a native API;
        // the watch loop does its own polling in that case.
        RecommendedWatcher::kind() != WatcherKind::PollWatcher
    }

    fn subscribe(
        &self,
        dir: &Path,
        events: EventSender,
    ) -> std::result::Result<Subscription, SubscribeError> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            // Receiver gone means the loop dropped this subscription.
            let _ = events.send(res);
        })
        .map_err(classify)?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(classify)?;

        Ok(Subscription::new(watcher))
    }
}

/// Backend that never delivers notifications, forcing polling mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollingOnly;

impl ChangeNotifier for PollingOnly {
    fn is_supported(&self) -> bool {
        false
    }

    fn subscribe(
        &self,
        _dir: &Path,
        _events: EventSender,
    ) -> std::result::Result<Subscription, SubscribeError> {
        Err(SubscribeError::Unsupported(
            "polling was requested explicitly".to_string(),
        ))
    }
}

/// Map a `notify` failure onto the watch loop's two recovery paths.
pub(crate) fn classify(err: notify::Error) -> SubscribeError {
    match &err.kind {
        notify::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::Unsupported => {
            SubscribeError::Unsupported(err.to_string())
        }
        // Watch descriptors exhausted (inotify max_user_watches) or a config
        // the backend refuses: retrying will not help.
        notify::ErrorKind::MaxFilesWatch | notify::ErrorKind::InvalidConfig(_) => {
            SubscribeError::Unsupported(err.to_string())
        }
        _ => SubscribeError::Io(err.to_string()),
    }
}
