//! Error types for change-notify.

use std::fmt;

/// Result type alias for hook operations.
pub type Result<T> = std::result::Result<T, HookError>;

/// The step of an update call an error or timeout belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Waiting for the hook's call lock.
    Lock,
    /// Reading the row before the write.
    ReadBefore,
    /// The write itself (partial update or upsert).
    Write,
    /// Reading the row after the write committed.
    ReadAfter,
    /// Handing the notification to the publisher.
    Publish,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lock => "lock",
            Self::ReadBefore => "read-before",
            Self::Write => "write",
            Self::ReadAfter => "read-after",
            Self::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// Errors that fail an `update` or `save` call.
///
/// Only persistence faults surface here. Anything that goes wrong on the
/// notification path is reported through [`NotifyError`] instead.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// The watched field name was empty.
    #[error("Watched field name must not be empty")]
    EmptyFieldName,

    /// A row passed to `save` carries no identity to read its current state by.
    #[error("Row has no identity; cannot read its persisted state")]
    MissingIdentity,

    /// A snapshot could not be read.
    #[error("Failed to read {phase} snapshot: {source}")]
    ReadFailure {
        /// Which read failed
        phase: Phase,
        /// The store's error, unchanged
        #[source]
        source: StoreError,
    },

    /// The persistence engine rejected the write.
    #[error("Write rejected: {0}")]
    WriteFailure(#[source] StoreError),

    /// A persistence step (or waiting for the call lock) did not finish before
    /// the call's deadline. A write that timed out may still have committed.
    #[error("Deadline exceeded during {0}")]
    Timeout(Phase),

    /// Hook settings could not be loaded or were incomplete.
    #[error("Settings error: {0}")]
    Settings(String),

    /// Hook settings failed validation.
    #[error("Settings validation failed: {0}")]
    Validation(String),
}

/// Errors reported by a [`Store`](crate::store::Store) implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No row matched the filter.
    #[error("No row matched the filter")]
    NotFound,

    /// The filter matched more than one row where exactly one was required.
    #[error("Filter matched {matches} rows; expected exactly one")]
    Ambiguous {
        /// Number of rows the filter matched
        matches: usize,
    },

    /// The engine refused the operation (constraint violation, bad patch, ...).
    #[error("{0}")]
    Rejected(String),

    /// Any engine-specific error, kept intact for downcasting.
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap an engine-specific error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

/// Errors reported by a [`Publisher`](crate::publish::Publisher) or a
/// [`MessageBuilder`](crate::publish::MessageBuilder).
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Nothing is listening on the destination.
    #[error("No route to destination '{0}'")]
    NoRoute(String),

    /// The queue service refused the message.
    #[error("Message rejected: {0}")]
    Rejected(String),

    /// The queue service could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The message body could not be encoded.
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    /// The publisher was configured with invalid options.
    #[error("Invalid publisher configuration: {0}")]
    Config(String),
}

/// Reasons a notification was not delivered. Never fatal to the write.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The watched field is absent or unreadable on a snapshot.
    #[error("Field '{field}' is missing on the {phase} snapshot")]
    MissingField {
        /// The watched field
        field: String,
        /// The snapshot it was missing from
        phase: Phase,
    },

    /// The field's values cannot be compared structurally.
    #[error("Field '{field}' holds values that cannot be compared")]
    IncomparableValue {
        /// The watched field
        field: String,
    },

    /// The message body could not be built.
    #[error("Failed to build message: {0}")]
    Message(#[source] PublishError),

    /// The publisher rejected the notification.
    #[error("Failed to publish notification: {0}")]
    Publish(#[source] PublishError),

    /// The publisher did not answer before the deadline.
    #[error("Publishing timed out")]
    PublishTimeout,
}

impl NotifyError {
    /// Whether this represents a notification that should have gone out but
    /// was lost, as opposed to a comparison that was skipped.
    pub fn is_lost_notification(&self) -> bool {
        matches!(
            self,
            Self::Message(_) | Self::Publish(_) | Self::PublishTimeout
        )
    }
}

/// Validation error for hook settings.
#[derive(Debug)]
pub enum ValidationError {
    /// Custom validation error with a message.
    Custom(String),

    /// A specific field has an invalid value.
    InvalidField {
        /// The field name/path
        field: String,
        /// The reason why it's invalid
        reason: String,
    },

    /// Multiple validation errors occurred.
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Create a custom validation error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(msg) => write!(f, "{}", msg),
            Self::InvalidField { field, reason } => {
                write!(f, "Field '{}' is invalid: {}", field, reason)
            }
            Self::Multiple(errors) => {
                writeln!(f, "Multiple validation errors:")?;
                for (i, err) in errors.iter().enumerate() {
                    writeln!(f, "  {}. {}", i + 1, err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for HookError {
    fn from(err: ValidationError) -> Self {
        HookError::Validation(err.to_string())
    }
}
