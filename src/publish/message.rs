//! Message bodies for detected changes.

use crate::core::FieldChange;
use crate::error::PublishError;
use crate::record::FieldValue;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Builds the body of the notification sent for a change.
///
/// Closures taking a `&FieldChange` and returning a `String` implement this
/// trait, so simple formats don't need a dedicated type.
///
/// # Examples
///
/// ```rust
/// use change_notify::core::FieldChange;
/// use change_notify::publish::MessageBuilder;
///
/// fn builder() -> impl MessageBuilder {
///     |change: &FieldChange| format!("{} changed", change.field)
/// }
/// ```
pub trait MessageBuilder: Send + Sync {
    /// Build the message body for `change`.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be encoded.
    fn build(&self, change: &FieldChange) -> Result<String, PublishError>;
}

impl<F> MessageBuilder for F
where
    F: Fn(&FieldChange) -> String + Send + Sync,
{
    fn build(&self, change: &FieldChange) -> Result<String, PublishError> {
        Ok(self(change))
    }
}

/// Sends the same body for every change.
#[derive(Debug, Clone)]
pub struct StaticMessage {
    body: String,
}

impl StaticMessage {
    /// Create a builder that always produces `body`.
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

impl MessageBuilder for StaticMessage {
    fn build(&self, _change: &FieldChange) -> Result<String, PublishError> {
        Ok(self.body.clone())
    }
}

/// Encodes the change itself as a JSON document.
///
/// ```json
/// {"entity":"orders","field":"status","key":1,"before":"pending","after":"shipped","detected_at":"2024-05-01T12:00:00Z"}
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChangeEventMessage {
    entity: Option<String>,
}

impl ChangeEventMessage {
    /// Create a JSON change-event builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every event with an entity (table/model) name.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

#[derive(Serialize)]
struct ChangeEvent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    entity: Option<&'a str>,
    field: &'a str,
    key: Option<&'a FieldValue>,
    before: &'a FieldValue,
    after: &'a FieldValue,
    detected_at: DateTime<Utc>,
}

impl MessageBuilder for ChangeEventMessage {
    fn build(&self, change: &FieldChange) -> Result<String, PublishError> {
        let event = ChangeEvent {
            entity: self.entity.as_deref(),
            field: &change.field,
            key: change.key.as_ref(),
            before: &change.before,
            after: &change.after,
            detected_at: change.detected_at,
        };
        Ok(serde_json::to_string(&event)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn change() -> FieldChange {
        FieldChange {
            field: "status".to_string(),
            key: Some(FieldValue::Int(1)),
            before: FieldValue::from("pending"),
            after: FieldValue::from("shipped"),
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn test_static_message() {
        let builder = StaticMessage::new("order-updated");
        assert_eq!(builder.build(&change()).unwrap(), "order-updated");
    }

    #[test]
    fn test_change_event_message() {
        let body = ChangeEventMessage::new()
            .with_entity("orders")
            .build(&change())
            .unwrap();
        let value: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(value["entity"], json!("orders"));
        assert_eq!(value["field"], json!("status"));
        assert_eq!(value["key"], json!(1));
        assert_eq!(value["before"], json!("pending"));
        assert_eq!(value["after"], json!("shipped"));
        assert!(value["detected_at"].is_string());
    }

    #[test]
    fn test_change_event_without_entity() {
        let body = ChangeEventMessage::new().build(&change()).unwrap();
        let value: Value = serde_json::from_str(&body).unwrap();
        assert!(value.get("entity").is_none());
    }

    #[test]
    fn test_closure_builder() {
        let builder = |change: &FieldChange| format!("{}:{:?}", change.field, change.key);
        assert_eq!(builder.build(&change()).unwrap(), "status:Some(Int(1))");
    }
}
