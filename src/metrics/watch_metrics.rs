//! Watcher metrics tracking using OpenTelemetry.

use crate::core::ChangeTrigger;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Gauge, Meter};
use std::sync::Arc;
use std::time::Instant;

/// Metrics collector for a [`FileWatcher`](crate::core::FileWatcher).
///
/// # Examples
///
/// ```rust,no_run
/// use config_file_watcher::core::ChangeTrigger;
/// use config_file_watcher::metrics::WatchMetrics;
/// use opentelemetry::global;
///
/// let meter = global::meter("config-file-watcher");
/// let metrics = WatchMetrics::new(meter);
///
/// metrics.record_notification(ChangeTrigger::Event);
/// ```
#[derive(Clone)]
pub struct WatchMetrics {
    notifications: Counter<u64>,
    fallbacks: Counter<u64>,
    subscribe_errors: Counter<u64>,
    listener_panics: Counter<u64>,
    seconds_since_change: Gauge<i64>,
    last_change: Arc<parking_lot::Mutex<Instant>>,
}

impl WatchMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let notifications = meter
            .u64_counter("config_file_watcher.notifications")
            .with_description("Number of listener invocations")
            .build();

        let fallbacks = meter
            .u64_counter("config_file_watcher.fallbacks")
            .with_description("Number of downgrades to polling mode")
            .build();

        let subscribe_errors = meter
            .u64_counter("config_file_watcher.subscribe_errors")
            .with_description("Number of failed directory subscriptions")
            .build();

        let listener_panics = meter
            .u64_counter("config_file_watcher.listener_panics")
            .with_description("Number of listener invocations that panicked")
            .build();

        let seconds_since_change = meter
            .i64_gauge("config_file_watcher.since_change")
            .with_description("Time since the last detected change in seconds")
            .with_unit("s")
            .build();

        Self {
            notifications,
            fallbacks,
            subscribe_errors,
            listener_panics,
            seconds_since_change,
            last_change: Arc::new(parking_lot::Mutex::new(Instant::now())),
        }
    }

    /// Record a listener invocation and what detected the change.
    pub fn record_notification(&self, trigger: ChangeTrigger) {
        self.notifications
            .add(1, &[KeyValue::new("trigger", trigger.as_str())]);
        *self.last_change.lock() = Instant::now();
    }

    /// Record the switch to polling mode.
    pub fn record_fallback(&self) {
        self.fallbacks.add(1, &[]);
    }

    /// Record a transient subscription failure.
    pub fn record_subscribe_error(&self) {
        self.subscribe_errors.add(1, &[]);
    }

    /// Record a listener that panicked.
    pub fn record_listener_panic(&self) {
        self.listener_panics.add(1, &[]);
    }

    /// Update the time-since-last-change gauge.
    ///
    /// The watch loop calls this on every quiescence timeout and polling tick.
    pub fn update_since_change(&self) {
        let secs = self.last_change.lock().elapsed().as_secs() as i64;
        self.seconds_since_change.record(secs, &[]);
    }
}
