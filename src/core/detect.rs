//! Change detection on a single watched field.

use crate::error::{NotifyError, Phase};
use crate::record::{FieldValue, Record};
use chrono::{DateTime, Utc};

/// A detected change of the watched field between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    /// The watched field
    pub field: String,
    /// Identity of the changed row, if the snapshots expose one
    pub key: Option<FieldValue>,
    /// Value before the write
    pub before: FieldValue,
    /// Value after the write committed
    pub after: FieldValue,
    /// When the difference was observed
    pub detected_at: DateTime<Utc>,
}

/// Compare `field` between two snapshots.
///
/// Returns `Ok(None)` when the values are structurally equal and
/// `Ok(Some(change))` when they differ.
///
/// # Errors
///
/// Returns [`NotifyError::MissingField`] if either snapshot lacks the field and
/// [`NotifyError::IncomparableValue`] if the values cannot be compared. Both
/// mean "skip the notification", never "fail the write".
///
/// # Examples
///
/// ```rust
/// use change_notify::core::detect_change;
/// use change_notify::record::Row;
///
/// let before = Row::new().with("status", "pending");
/// let after = Row::new().with("status", "shipped");
///
/// let change = detect_change("status", &before, &after).unwrap().unwrap();
/// assert_eq!(change.after.as_text(), Some("shipped"));
/// assert!(detect_change("status", &before, &before).unwrap().is_none());
/// ```
pub fn detect_change<R: Record + ?Sized>(
    field: &str,
    before: &R,
    after: &R,
) -> Result<Option<FieldChange>, NotifyError> {
    let old = before.field(field).ok_or_else(|| NotifyError::MissingField {
        field: field.to_string(),
        phase: Phase::ReadBefore,
    })?;
    let new = after.field(field).ok_or_else(|| NotifyError::MissingField {
        field: field.to_string(),
        phase: Phase::ReadAfter,
    })?;

    match old.structural_eq(&new) {
        None => Err(NotifyError::IncomparableValue {
            field: field.to_string(),
        }),
        Some(true) => Ok(None),
        Some(false) => Ok(Some(FieldChange {
            field: field.to_string(),
            key: after.key().or_else(|| before.key()),
            before: old,
            after: new,
            detected_at: Utc::now(),
        })),
    }
}
