//! Schema-described rows.

use super::{FieldValue, Record};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// A row described by its column names rather than a Rust type.
///
/// `Row` is what [`MemoryStore`](crate::store::MemoryStore) hands out, and a
/// convenient snapshot type for stores that read untyped result sets.
///
/// # Examples
///
/// ```rust
/// use change_notify::record::{Record, Row};
///
/// let row = Row::new()
///     .with_key_field("id")
///     .with("id", 1u64)
///     .with("status", "pending");
///
/// assert_eq!(row.field("status").unwrap().as_text(), Some("pending"));
/// assert!(row.field("Status").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    key_field: Option<String>,
    fields: BTreeMap<String, FieldValue>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the column that identifies this row.
    pub fn with_key_field(mut self, name: impl Into<String>) -> Self {
        self.key_field = Some(name.into());
        self
    }

    /// Add or replace a column.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Add or replace a column in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Borrow a column value.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Remove a column, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// The identifying column's name, if one was set.
    pub fn key_field(&self) -> Option<&str> {
        self.key_field.as_deref()
    }

    /// Iterate over columns in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a row from a JSON object's top-level members.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not a JSON object.
    pub fn from_json(value: JsonValue) -> Result<Self, serde_json::Error> {
        match value {
            JsonValue::Object(map) => Ok(Self::from_json_map(map)),
            other => Err(<serde_json::Error as serde::de::Error>::custom(format!(
                "expected a JSON object for a row, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Build a row from a JSON object map.
    pub fn from_json_map(map: Map<String, JsonValue>) -> Self {
        Self {
            key_field: None,
            fields: map
                .into_iter()
                .map(|(name, value)| (name, FieldValue::from(value)))
                .collect(),
        }
    }

    /// Build a row from any serializable struct.
    ///
    /// Field names are taken exactly as serde emits them, so `#[serde(rename)]`
    /// attributes decide the column names.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not serialize to a JSON object.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use change_notify::record::{Record, Row};
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct Invoice {
    ///     id: u64,
    ///     state: String,
    /// }
    ///
    /// let row = Row::from_serialize(&Invoice { id: 9, state: "open".into() })
    ///     .unwrap()
    ///     .with_key_field("id");
    /// assert!(row.key().is_some());
    /// ```
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Self::from_json(serde_json::to_value(value)?)
    }

    /// Render the row as a JSON object.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl Record for Row {
    fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).cloned()
    }

    fn key(&self) -> Option<FieldValue> {
        self.key_field
            .as_deref()
            .and_then(|name| self.fields.get(name))
            .filter(|value| !matches!(value, FieldValue::Null))
            .cloned()
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
