//! Hook settings and their loading.

mod loader;

pub use loader::SettingsLoader;

use crate::core::Validate;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime settings of a [`ChangeNotifyHook`](crate::core::ChangeNotifyHook).
///
/// Every field has a default except `destination`, which must be set.
///
/// ```yaml
/// destination: https://sqs.eu-west-1.amazonaws.com/123456789012/orders
/// message_body: '{"event":"order-status-changed"}'
/// call_timeout_ms: 5000
/// publish_timeout_ms: 1000
/// serialize_calls: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookSettings {
    /// Queue URL / topic / endpoint notifications are sent to
    pub destination: String,
    /// Fixed message body; when unset the change is sent as a JSON event
    pub message_body: Option<String>,
    /// Deadline for a whole update call, in milliseconds
    pub call_timeout_ms: Option<u64>,
    /// Extra cap on the publish step, in milliseconds
    pub publish_timeout_ms: Option<u64>,
    /// Hold a per-hook lock across each call
    pub serialize_calls: bool,
}

impl HookSettings {
    /// Settings with the given destination and defaults for everything else.
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// The per-call deadline, if configured.
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// The publish-step cap, if configured.
    pub fn publish_timeout(&self) -> Option<Duration> {
        self.publish_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            destination: String::new(),
            message_body: None,
            call_timeout_ms: None,
            publish_timeout_ms: None,
            serialize_calls: true,
        }
    }
}

impl Validate for HookSettings {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        if self.destination.trim().is_empty() {
            errors.push(ValidationError::invalid_field(
                "destination",
                "must not be empty",
            ));
        }
        if self.call_timeout_ms == Some(0) {
            errors.push(ValidationError::invalid_field(
                "call_timeout_ms",
                "must be greater than 0",
            ));
        }
        if self.publish_timeout_ms == Some(0) {
            errors.push(ValidationError::invalid_field(
                "publish_timeout_ms",
                "must be greater than 0",
            ));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }
}
