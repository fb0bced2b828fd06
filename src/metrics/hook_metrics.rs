//! Hook metrics tracking using OpenTelemetry.

use crate::core::NotifyOutcome;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use std::sync::Arc;
use std::time::Instant;

/// Metrics collector for hook calls.
///
/// Lost notifications (`change_notify.notifications.failed`) are the number
/// to alert on: each one is a change nobody downstream heard about.
///
/// # Examples
///
/// ```rust,no_run
/// use change_notify::metrics::HookMetrics;
/// use opentelemetry::global;
///
/// let meter = global::meter("change-notify");
/// let metrics = HookMetrics::new(meter);
///
/// let timer = metrics.start_call();
/// // ... perform the update ...
/// metrics.record_call_failure(timer);
/// ```
#[derive(Clone)]
pub struct HookMetrics {
    calls: Counter<u64>,
    call_failures: Counter<u64>,
    call_duration: Histogram<f64>,
    changes_detected: Counter<u64>,
    notifications_published: Counter<u64>,
    notifications_failed: Counter<u64>,
    notifications_skipped: Counter<u64>,
    notification_age_seconds: Gauge<i64>,
    last_publish: Arc<parking_lot::Mutex<Option<Instant>>>,
}

impl HookMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let calls = meter
            .u64_counter("change_notify.calls")
            .with_description("Total number of update and save calls")
            .build();

        let call_failures = meter
            .u64_counter("change_notify.calls.failed")
            .with_description("Number of calls that failed on the persistence path")
            .build();

        let call_duration = meter
            .f64_histogram("change_notify.call.duration")
            .with_description("Duration of update and save calls in seconds")
            .with_unit("s")
            .build();

        let changes_detected = meter
            .u64_counter("change_notify.changes.detected")
            .with_description("Number of calls where the watched field changed")
            .build();

        let notifications_published = meter
            .u64_counter("change_notify.notifications.published")
            .with_description("Number of notifications handed to the publisher")
            .build();

        let notifications_failed = meter
            .u64_counter("change_notify.notifications.failed")
            .with_description("Number of notifications lost to build, publish or timeout failures")
            .build();

        let notifications_skipped = meter
            .u64_counter("change_notify.notifications.skipped")
            .with_description("Number of comparisons skipped for missing or incomparable fields")
            .build();

        let notification_age_seconds = meter
            .i64_gauge("change_notify.notification.age")
            .with_description("Time since the last published notification in seconds")
            .with_unit("s")
            .build();

        Self {
            calls,
            call_failures,
            call_duration,
            changes_detected,
            notifications_published,
            notifications_failed,
            notifications_skipped,
            notification_age_seconds,
            last_publish: Arc::new(parking_lot::Mutex::new(None)),
        }
    }

    /// Start a call timer.
    ///
    /// Pass the returned `Instant` to [`record_call`](Self::record_call) or
    /// [`record_call_failure`](Self::record_call_failure).
    pub fn start_call(&self) -> Instant {
        self.calls.add(1, &[]);
        Instant::now()
    }

    /// Record a call whose write succeeded, along with its notification outcome.
    pub fn record_call(&self, start: Instant, outcome: &NotifyOutcome) {
        self.call_duration.record(start.elapsed().as_secs_f64(), &[]);

        match outcome {
            NotifyOutcome::Unchanged => {}
            NotifyOutcome::Published(_) => {
                self.changes_detected.add(1, &[]);
                self.notifications_published.add(1, &[]);
                *self.last_publish.lock() = Some(Instant::now());
            }
            NotifyOutcome::Skipped(reason) if reason.is_lost_notification() => {
                self.changes_detected.add(1, &[]);
                self.notifications_failed.add(1, &[]);
            }
            NotifyOutcome::Skipped(_) => {
                self.notifications_skipped.add(1, &[]);
            }
        }
    }

    /// Record a call that failed on the persistence path.
    pub fn record_call_failure(&self, start: Instant) {
        self.call_duration.record(start.elapsed().as_secs_f64(), &[]);
        self.call_failures.add(1, &[]);
    }

    /// Update the notification age gauge.
    ///
    /// Call this periodically; nothing is recorded before the first publish.
    pub fn update_notification_age(&self) {
        if let Some(last) = *self.last_publish.lock() {
            self.notification_age_seconds
                .record(last.elapsed().as_secs() as i64, &[]);
        }
    }

    /// Seconds since the last published notification, if any.
    pub fn seconds_since_last_publish(&self) -> Option<u64> {
        self.last_publish.lock().map(|last| last.elapsed().as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotifyError;
    use crate::publish::Notification;
    use opentelemetry::global;

    #[test]
    fn test_metrics_creation() {
        let metrics = HookMetrics::new(global::meter("test"));

        let timer = metrics.start_call();
        metrics.record_call(timer, &NotifyOutcome::Unchanged);

        let timer = metrics.start_call();
        metrics.record_call_failure(timer);

        metrics.update_notification_age();
        assert_eq!(metrics.seconds_since_last_publish(), None);
    }

    #[test]
    fn test_publish_tracks_age() {
        let metrics = HookMetrics::new(global::meter("test"));

        let timer = metrics.start_call();
        metrics.record_call(
            timer,
            &NotifyOutcome::Published(Notification::new("orders", "{}")),
        );

        assert_eq!(metrics.seconds_since_last_publish(), Some(0));
        metrics.update_notification_age();
    }

    #[test]
    fn test_metrics_clone_shares_state() {
        let metrics = HookMetrics::new(global::meter("test"));
        let metrics2 = metrics.clone();

        let timer = metrics2.start_call();
        metrics2.record_call(
            timer,
            &NotifyOutcome::Published(Notification::new("orders", "{}")),
        );
        metrics.record_call(
            metrics.start_call(),
            &NotifyOutcome::Skipped(NotifyError::PublishTimeout),
        );

        assert!(metrics.seconds_since_last_publish().is_some());
    }
}
