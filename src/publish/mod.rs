//! Notification delivery.
//!
//! A [`Publisher`] hands a [`Notification`] to a queue or other destination.
//! A [`MessageBuilder`] turns a detected [`FieldChange`](crate::core::FieldChange)
//! into the message body.

mod message;
pub mod subscriber;

#[cfg(feature = "sqs")]
mod sqs;

#[cfg(feature = "webhook")]
mod http;

pub use message::{ChangeEventMessage, MessageBuilder, StaticMessage};
pub use subscriber::{SubscriberRegistry, SubscriptionHandle};

#[cfg(feature = "sqs")]
pub use sqs::SqsPublisher;

#[cfg(feature = "webhook")]
pub use http::{HttpAuth, HttpPublisher, HttpPublisherBuilder};

use crate::error::PublishError;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// A message body addressed to a destination (queue URL, topic, endpoint).
///
/// The hook never looks inside the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Where the message goes
    pub destination: String,
    /// The message payload
    pub body: String,
}

impl Notification {
    /// Create a notification.
    pub fn new(destination: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            body: body.into(),
        }
    }
}

/// Delivers notifications to a queueing service.
///
/// Implementations should not retry indefinitely: the hook bounds the call
/// with a deadline and treats any error as a lost notification.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Send one notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination refused the message or could not
    /// be reached.
    async fn publish(&self, notification: &Notification) -> Result<(), PublishError>;

    /// Get a human-readable name for this publisher (for logging/debugging).
    fn name(&self) -> String;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    async fn publish(&self, notification: &Notification) -> Result<(), PublishError> {
        (**self).publish(notification).await
    }

    fn name(&self) -> String {
        (**self).name()
    }
}
