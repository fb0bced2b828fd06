//! The change-notification hook wrapping a store's writes.

use crate::core::{Validate, detect_change};
use crate::error::{HookError, NotifyError, Phase, PublishError, Result};
use crate::publish::{ChangeEventMessage, MessageBuilder, Notification, Publisher};
use crate::settings::HookSettings;
use crate::store::Store;
use arc_swap::ArcSwap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[cfg(feature = "metrics")]
use crate::metrics::HookMetrics;

/// What happened on the notification path of a successful call.
#[derive(Debug)]
pub enum NotifyOutcome {
    /// The watched field kept its value; nothing was sent.
    Unchanged,
    /// The field changed and this notification was accepted by the publisher.
    Published(Notification),
    /// No notification went out. See [`NotifyError::is_lost_notification`] to
    /// tell a lost notification from a skipped comparison.
    Skipped(NotifyError),
}

/// Result of a successful `update` or `save` call.
#[derive(Debug)]
pub struct UpdateReport {
    /// Rows the engine reported as written
    pub rows_affected: u64,
    /// Notification outcome
    pub notify: NotifyOutcome,
}

impl UpdateReport {
    /// The published notification, if one went out.
    pub fn published(&self) -> Option<&Notification> {
        match &self.notify {
            NotifyOutcome::Published(notification) => Some(notification),
            _ => None,
        }
    }

    /// Whether the watched field was seen to change, whether or not the
    /// notification made it out.
    pub fn changed(&self) -> bool {
        match &self.notify {
            NotifyOutcome::Published(_) => true,
            NotifyOutcome::Skipped(reason) => reason.is_lost_notification(),
            NotifyOutcome::Unchanged => false,
        }
    }
}

/// Wraps writes to a [`Store`] and publishes a notification when one watched
/// field changes.
///
/// Each call reads the row, writes it, reads it back and compares the
/// watched field. Persistence errors fail the call; notification problems
/// are logged and reported in the [`UpdateReport`] but never fail it.
///
/// Clones share the store, publisher, settings and call lock, so they behave
/// as the same hook instance.
///
/// # Examples
///
/// ```rust,no_run
/// use change_notify::prelude::*;
/// use change_notify::publish::SubscriberRegistry;
/// use change_notify::store::{Filter, MemoryStore};
/// use serde_json::json;
///
/// # async fn example() -> Result<()> {
/// let hook = ChangeNotifyHook::builder(MemoryStore::new("id"))
///     .with_publisher(SubscriberRegistry::new())
///     .with_destination("orders")
///     .build()?;
///
/// let report = hook
///     .update("status", &Filter::eq("id", 1), &json!({ "status": "shipped" }))
///     .await?;
/// println!("notified: {}", report.published().is_some());
/// # Ok(())
/// # }
/// ```
pub struct ChangeNotifyHook<S: Store> {
    store: Arc<S>,
    publisher: Arc<dyn Publisher>,
    message: Option<Arc<dyn MessageBuilder>>,
    settings: Arc<ArcSwap<HookSettings>>,
    call_lock: Arc<Mutex<()>>,
    #[cfg(feature = "metrics")]
    metrics: Option<HookMetrics>,
}

impl<S: Store> ChangeNotifyHook<S> {
    /// Assemble a hook from validated parts.
    pub(crate) fn from_parts(
        store: Arc<S>,
        publisher: Arc<dyn Publisher>,
        message: Option<Arc<dyn MessageBuilder>>,
        settings: HookSettings,
    ) -> Self {
        Self {
            store,
            publisher,
            message,
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            call_lock: Arc::new(Mutex::new(())),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Attach a metrics collector.
    #[cfg(feature = "metrics")]
    pub(crate) fn with_metrics(mut self, metrics: Option<HookMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The wrapped store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The current settings.
    pub fn settings(&self) -> Arc<HookSettings> {
        self.settings.load_full()
    }

    /// Replace the settings.
    ///
    /// Calls already in flight keep the settings they started with.
    ///
    /// # Errors
    ///
    /// Returns an error if the new settings fail validation; the old settings
    /// are kept.
    pub fn update_settings(&self, settings: HookSettings) -> Result<()> {
        settings.validate()?;
        self.settings.store(Arc::new(settings));
        Ok(())
    }

    /// Partially update the row matching `filter` and notify if `field`
    /// changed.
    ///
    /// The call is bounded by the configured `call_timeout_ms`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `field` is empty
    /// - The row cannot be read before the write (including no match or
    ///   several matches)
    /// - The store rejects the write
    /// - The row cannot be read back after the write
    /// - The deadline passes before the write path completes
    pub async fn update(
        &self,
        field: &str,
        filter: &S::Filter,
        patch: &S::Patch,
    ) -> Result<UpdateReport> {
        let deadline = self.default_deadline();
        self.observed(self.run_update(field, filter, patch, deadline))
            .await
    }

    /// Like [`update`](Self::update), but bounded by an explicit deadline.
    pub async fn update_with_deadline(
        &self,
        field: &str,
        filter: &S::Filter,
        patch: &S::Patch,
        deadline: Instant,
    ) -> Result<UpdateReport> {
        self.observed(self.run_update(field, filter, patch, Some(deadline)))
            .await
    }

    /// Upsert `row` and notify if `field` changed.
    ///
    /// The current state is read by the row's own identity, so the row must
    /// already exist.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update), plus [`HookError::MissingIdentity`]
    /// if the store cannot build an identity filter for `row`.
    pub async fn save(&self, row: &S::Row, field: &str) -> Result<UpdateReport> {
        let deadline = self.default_deadline();
        self.observed(self.run_save(row, field, deadline)).await
    }

    /// Like [`save`](Self::save), but bounded by an explicit deadline.
    pub async fn save_with_deadline(
        &self,
        row: &S::Row,
        field: &str,
        deadline: Instant,
    ) -> Result<UpdateReport> {
        self.observed(self.run_save(row, field, Some(deadline)))
            .await
    }

    async fn run_update(
        &self,
        field: &str,
        filter: &S::Filter,
        patch: &S::Patch,
        deadline: Option<Instant>,
    ) -> Result<UpdateReport> {
        ensure_field(field)?;
        let _guard = self.acquire(deadline).await?;

        let before = within(deadline, Phase::ReadBefore, self.store.find_one(filter))
            .await?
            .map_err(|source| HookError::ReadFailure {
                phase: Phase::ReadBefore,
                source,
            })?;

        let rows_affected = within(deadline, Phase::Write, self.store.update(filter, patch))
            .await?
            .map_err(HookError::WriteFailure)?;
        debug!(store = %self.store.name(), rows_affected, "update written");

        if rows_affected != 1 {
            warn!(
                store = %self.store.name(),
                rows_affected,
                "update did not affect exactly one row; comparing the row read before the write"
            );
        }

        // The filter may match on columns the patch just changed, so read the
        // row back by identity when it has one.
        let identity = self.store.identity_filter(&before);
        let after_filter = identity.as_ref().unwrap_or(filter);
        let after = within(deadline, Phase::ReadAfter, self.store.find_one(after_filter))
            .await?
            .map_err(|source| HookError::ReadFailure {
                phase: Phase::ReadAfter,
                source,
            })?;

        let notify = self.notify(field, &before, &after, deadline).await;
        Ok(UpdateReport {
            rows_affected,
            notify,
        })
    }

    async fn run_save(
        &self,
        row: &S::Row,
        field: &str,
        deadline: Option<Instant>,
    ) -> Result<UpdateReport> {
        ensure_field(field)?;
        let identity = self
            .store
            .identity_filter(row)
            .ok_or(HookError::MissingIdentity)?;
        let _guard = self.acquire(deadline).await?;

        let before = within(deadline, Phase::ReadBefore, self.store.find_one(&identity))
            .await?
            .map_err(|source| HookError::ReadFailure {
                phase: Phase::ReadBefore,
                source,
            })?;

        within(deadline, Phase::Write, self.store.upsert(row))
            .await?
            .map_err(HookError::WriteFailure)?;
        debug!(store = %self.store.name(), "upsert written");

        let after = within(deadline, Phase::ReadAfter, self.store.find_one(&identity))
            .await?
            .map_err(|source| HookError::ReadFailure {
                phase: Phase::ReadAfter,
                source,
            })?;

        let notify = self.notify(field, &before, &after, deadline).await;
        Ok(UpdateReport {
            rows_affected: 1,
            notify,
        })
    }

    /// Compare the snapshots and publish on change. Never fails the call.
    async fn notify(
        &self,
        field: &str,
        before: &S::Row,
        after: &S::Row,
        deadline: Option<Instant>,
    ) -> NotifyOutcome {
        let change = match detect_change(field, before, after) {
            Ok(Some(change)) => change,
            Ok(None) => {
                debug!(field, "watched field unchanged");
                return NotifyOutcome::Unchanged;
            }
            Err(reason) => {
                warn!(field, error = %reason, "skipping change notification");
                return NotifyOutcome::Skipped(reason);
            }
        };

        let settings = self.settings.load_full();
        let body = match self.build_body(&change, &settings) {
            Ok(body) => body,
            Err(e) => {
                error!(field, error = %e, "change notification lost: message could not be built");
                return NotifyOutcome::Skipped(NotifyError::Message(e));
            }
        };

        let notification = Notification::new(settings.destination.clone(), body);
        let deadline = publish_deadline(deadline, settings.publish_timeout());

        match within(deadline, Phase::Publish, self.publisher.publish(&notification)).await {
            Ok(Ok(())) => {
                info!(
                    field,
                    destination = %notification.destination,
                    publisher = %self.publisher.name(),
                    "change notification published"
                );
                NotifyOutcome::Published(notification)
            }
            Ok(Err(e)) => {
                error!(
                    field,
                    destination = %notification.destination,
                    publisher = %self.publisher.name(),
                    error = %e,
                    "change notification lost"
                );
                NotifyOutcome::Skipped(NotifyError::Publish(e))
            }
            Err(_) => {
                error!(
                    field,
                    destination = %notification.destination,
                    publisher = %self.publisher.name(),
                    "change notification lost: publish timed out"
                );
                NotifyOutcome::Skipped(NotifyError::PublishTimeout)
            }
        }
    }

    fn build_body(
        &self,
        change: &crate::core::FieldChange,
        settings: &HookSettings,
    ) -> std::result::Result<String, PublishError> {
        if let Some(message) = &self.message {
            return message.build(change);
        }
        match &settings.message_body {
            Some(body) => Ok(body.clone()),
            None => ChangeEventMessage::new().build(change),
        }
    }

    async fn acquire(&self, deadline: Option<Instant>) -> Result<Option<MutexGuard<'_, ()>>> {
        let serialize = self.settings.load().serialize_calls;
        if !serialize {
            return Ok(None);
        }
        within(deadline, Phase::Lock, self.call_lock.lock())
            .await
            .map(Some)
    }

    fn default_deadline(&self) -> Option<Instant> {
        let timeout = self.settings.load().call_timeout();
        timeout.map(|timeout| Instant::now() + timeout)
    }

    async fn observed<F>(&self, call: F) -> Result<UpdateReport>
    where
        F: Future<Output = Result<UpdateReport>>,
    {
        #[cfg(feature = "metrics")]
        let timer = self.metrics.as_ref().map(HookMetrics::start_call);

        let result = call.await;
        if let Err(e) = &result {
            debug!(error = %e, "change-notify call failed");
        }

        #[cfg(feature = "metrics")]
        self.record_metrics(timer, &result);

        result
    }

    #[cfg(feature = "metrics")]
    fn record_metrics(&self, timer: Option<std::time::Instant>, result: &Result<UpdateReport>) {
        if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
            match result {
                Ok(report) => metrics.record_call(timer, &report.notify),
                Err(_) => metrics.record_call_failure(timer),
            }
        }
    }
}

impl<S: Store> Clone for ChangeNotifyHook<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            publisher: Arc::clone(&self.publisher),
            message: self.message.clone(),
            settings: Arc::clone(&self.settings),
            call_lock: Arc::clone(&self.call_lock),
            #[cfg(feature = "metrics")]
            metrics: self.metrics.clone(),
        }
    }
}

fn ensure_field(field: &str) -> Result<()> {
    if field.is_empty() {
        return Err(HookError::EmptyFieldName);
    }
    Ok(())
}

async fn within<F: Future>(deadline: Option<Instant>, phase: Phase, fut: F) -> Result<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| HookError::Timeout(phase)),
        None => Ok(fut.await),
    }
}

fn publish_deadline(call: Option<Instant>, cap: Option<Duration>) -> Option<Instant> {
    let capped = cap.map(|cap| Instant::now() + cap);
    match (call, capped) {
        (Some(call), Some(capped)) => Some(call.min(capped)),
        (call, capped) => call.or(capped),
    }
}
