//! Typed field access on row snapshots.

mod row;
mod value;

pub use row::Row;
pub use value::FieldValue;

/// Read access to a row's columns by name.
///
/// This is how the hook looks up the watched field on the before and after
/// snapshots. Implement it by hand for typed models, or use [`Row`].
///
/// # Examples
///
/// ```rust
/// use change_notify::record::{FieldValue, Record};
///
/// struct Order {
///     id: u64,
///     status: String,
/// }
///
/// impl Record for Order {
///     fn field(&self, name: &str) -> Option<FieldValue> {
///         match name {
///             "id" => Some(self.id.into()),
///             "status" => Some(self.status.as_str().into()),
///             _ => None,
///         }
///     }
///
///     fn key(&self) -> Option<FieldValue> {
///         Some(self.id.into())
///     }
/// }
/// ```
pub trait Record {
    /// Read a column by its exact name.
    ///
    /// Returns `None` if the column does not exist or cannot be read.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// The row's identity (primary key), if known.
    fn key(&self) -> Option<FieldValue> {
        None
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn field(&self, name: &str) -> Option<FieldValue> {
        (**self).field(name)
    }

    fn key(&self) -> Option<FieldValue> {
        (**self).key()
    }
}

impl Record for serde_json::Map<String, serde_json::Value> {
    fn field(&self, name: &str) -> Option<FieldValue> {
        self.get(name).cloned().map(FieldValue::from)
    }
}
