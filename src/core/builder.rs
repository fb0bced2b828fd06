//! Builder for constructing ChangeNotifyHook instances.

use crate::core::{ChangeNotifyHook, Validate};
use crate::error::{HookError, Result};
use crate::publish::{MessageBuilder, Publisher};
use crate::settings::{HookSettings, SettingsLoader};
use crate::store::Store;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[cfg(feature = "metrics")]
use crate::metrics::HookMetrics;

/// Builder for a [`ChangeNotifyHook`].
///
/// Settings come from, in order of preference: an explicit
/// [`HookSettings`] value, the files and environment variables added to the
/// builder, or the defaults. Individual overrides such as
/// [`with_destination`](Self::with_destination) are applied last and the
/// result is validated.
///
/// # Examples
///
/// ```rust,no_run
/// use change_notify::prelude::*;
/// use change_notify::publish::SubscriberRegistry;
/// use change_notify::store::MemoryStore;
/// use std::time::Duration;
///
/// # fn example() -> Result<()> {
/// let hook = ChangeNotifyHook::builder(MemoryStore::new("id"))
///     .with_publisher(SubscriberRegistry::new())
///     .with_settings_file("config/notify.yaml")
///     .with_env_overrides("CHANGE_NOTIFY", "__")
///     .with_call_timeout(Duration::from_secs(2))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ChangeNotifyHookBuilder<S: Store> {
    store: Arc<S>,
    publisher: Option<Arc<dyn Publisher>>,
    message: Option<Arc<dyn MessageBuilder>>,
    settings: Option<HookSettings>,
    loader: SettingsLoader,
    destination: Option<String>,
    call_timeout: Option<Duration>,
    publish_timeout: Option<Duration>,
    serialize_calls: Option<bool>,
    #[cfg(feature = "metrics")]
    metrics: Option<HookMetrics>,
}

impl<S: Store> ChangeNotifyHookBuilder<S> {
    /// Create a builder around a shared store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            publisher: None,
            message: None,
            settings: None,
            loader: SettingsLoader::new(),
            destination: None,
            call_timeout: None,
            publish_timeout: None,
            serialize_calls: None,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Set the publisher notifications are handed to. Required.
    pub fn with_publisher<P: Publisher + 'static>(mut self, publisher: P) -> Self {
        self.publisher = Some(Arc::new(publisher));
        self
    }

    /// Build message bodies with a custom builder instead of the
    /// configured `message_body` or the default JSON change event.
    pub fn with_message<M: MessageBuilder + 'static>(mut self, message: M) -> Self {
        self.message = Some(Arc::new(message));
        self
    }

    /// Use these settings instead of loading them.
    pub fn with_settings(mut self, settings: HookSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Load settings from a file. Later files override earlier ones.
    ///
    /// Ignored when [`with_settings`](Self::with_settings) is used.
    pub fn with_settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.loader = self.loader.with_file(path);
        self
    }

    /// Override settings from environment variables.
    ///
    /// # Arguments
    ///
    /// * `prefix` - Prefix for environment variables (e.g., "CHANGE_NOTIFY")
    /// * `separator` - Separator for nested keys (e.g., "__")
    ///
    /// Ignored when [`with_settings`](Self::with_settings) is used.
    pub fn with_env_overrides(mut self, prefix: &str, separator: &str) -> Self {
        self.loader = self.loader.with_env_overrides(prefix, separator);
        self
    }

    /// Override the destination.
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Override the per-call deadline.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Override the publish-step cap.
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = Some(timeout);
        self
    }

    /// Override whether calls on this hook run one at a time.
    pub fn serialize_calls(mut self, serialize: bool) -> Self {
        self.serialize_calls = Some(serialize);
        self
    }

    /// Record call and notification metrics.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, meter: opentelemetry::metrics::Meter) -> Self {
        self.metrics = Some(HookMetrics::new(meter));
        self
    }

    /// Build the hook.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No publisher was set
    /// - Settings files or environment variables cannot be loaded
    /// - The final settings fail validation
    pub fn build(self) -> Result<ChangeNotifyHook<S>> {
        let publisher = self
            .publisher
            .ok_or_else(|| HookError::Settings("A publisher is required".to_string()))?;

        let mut settings = match self.settings {
            Some(settings) => settings,
            None if self.loader.has_sources() => self.loader.load_unvalidated()?,
            None => HookSettings::default(),
        };

        if let Some(destination) = self.destination {
            settings.destination = destination;
        }
        if let Some(timeout) = self.call_timeout {
            settings.call_timeout_ms = Some(millis(timeout));
        }
        if let Some(timeout) = self.publish_timeout {
            settings.publish_timeout_ms = Some(millis(timeout));
        }
        if let Some(serialize) = self.serialize_calls {
            settings.serialize_calls = serialize;
        }

        settings.validate()?;
        debug!(
            store = %self.store.name(),
            publisher = %publisher.name(),
            destination = %settings.destination,
            "change-notify hook built"
        );

        let hook = ChangeNotifyHook::from_parts(self.store, publisher, self.message, settings);

        #[cfg(feature = "metrics")]
        let hook = hook.with_metrics(self.metrics);

        Ok(hook)
    }
}

impl<S: Store> ChangeNotifyHook<S> {
    /// Create a builder that takes ownership of `store`.
    pub fn builder(store: S) -> ChangeNotifyHookBuilder<S> {
        ChangeNotifyHookBuilder::new(Arc::new(store))
    }

    /// Create a builder around a store shared with other code.
    pub fn from_shared(store: Arc<S>) -> ChangeNotifyHookBuilder<S> {
        ChangeNotifyHookBuilder::new(store)
    }
}

/// Whole milliseconds, rounding sub-millisecond durations up so they stay
/// non-zero.
fn millis(duration: Duration) -> u64 {
    let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    if ms == 0 && !duration.is_zero() { 1 } else { ms }
}
