//! In-process publisher that fans notifications out to subscribers.

use super::{Notification, Publisher};
use crate::error::PublishError;
use async_trait::async_trait;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::RwLock;

type Callback = Box<dyn Fn(&Notification) + Send + Sync>;

/// Handle for a subscription that can be dropped to unsubscribe.
///
/// When the handle is dropped, the subscription is removed in the background.
pub struct SubscriptionHandle {
    id: usize,
    registry: Arc<RwLock<SubscriberRegistryInner>>,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        let id = self.id;
        let registry = Arc::clone(&self.registry);

        // Fast path when the lock is free; otherwise finish on the runtime.
        if let Ok(mut inner) = registry.try_write() {
            inner.subscribers.retain(|sub| sub.id != id);
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let mut inner = registry.write().await;
                inner.subscribers.retain(|sub| sub.id != id);
            });
        }
    }
}

struct Subscriber {
    id: usize,
    destination: String,
    callback: Callback,
}

/// Internal subscriber registry state.
struct SubscriberRegistryInner {
    subscribers: Vec<Subscriber>,
    next_id: usize,
}

/// Registry of in-process subscribers, usable as a [`Publisher`].
///
/// Subscribers listen on a destination name. Publishing to a destination
/// nobody listens on fails with [`PublishError::NoRoute`], which the hook
/// reports as a lost notification.
///
/// # Examples
///
/// ```rust,no_run
/// use change_notify::publish::{Notification, Publisher, SubscriberRegistry};
///
/// # async fn example() {
/// let registry = SubscriberRegistry::new();
///
/// let handle = registry.subscribe("orders", |notification| {
///     println!("order changed: {}", notification.body);
/// }).await;
///
/// registry
///     .publish(&Notification::new("orders", "{\"id\":1}"))
///     .await
///     .unwrap();
///
/// // Unsubscribe by dropping the handle
/// drop(handle);
/// # }
/// ```
pub struct SubscriberRegistry {
    inner: Arc<RwLock<SubscriberRegistryInner>>,
}

impl SubscriberRegistry {
    /// Create a new subscriber registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SubscriberRegistryInner {
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Subscribe to notifications sent to `destination`.
    ///
    /// Callbacks run inline on the publishing task while the registry is
    /// read-locked, so they should be quick and must not subscribe. A
    /// panicking callback is caught; the publish then fails with
    /// [`PublishError::Transport`] after the remaining subscribers ran.
    ///
    /// Returns a handle that can be dropped to unsubscribe.
    pub async fn subscribe<F>(&self, destination: impl Into<String>, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push(Subscriber {
            id,
            destination: destination.into(),
            callback: Box::new(callback),
        });

        SubscriptionHandle {
            id,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Get the number of active subscribers across all destinations.
    pub async fn subscriber_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.subscribers.len()
    }
}

#[async_trait]
impl Publisher for SubscriberRegistry {
    async fn publish(&self, notification: &Notification) -> Result<(), PublishError> {
        let inner = self.inner.read().await;
        let mut delivered = 0;
        let mut panicked = 0;
        for sub in inner
            .subscribers
            .iter()
            .filter(|sub| sub.destination == notification.destination)
        {
            // A panicking subscriber must not unwind into the caller's write path.
            match panic::catch_unwind(AssertUnwindSafe(|| (sub.callback)(notification))) {
                Ok(()) => delivered += 1,
                Err(_) => panicked += 1,
            }
        }

        if panicked > 0 {
            return Err(PublishError::Transport(format!(
                "{} subscriber(s) on '{}' panicked",
                panicked, notification.destination
            )));
        }
        if delivered == 0 {
            return Err(PublishError::NoRoute(notification.destination.clone()));
        }
        Ok(())
    }

    fn name(&self) -> String {
        "subscribers".to_string()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SubscriberRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
