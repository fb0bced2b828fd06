//! Field values captured from a row snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// A single column value read from a snapshot.
///
/// Values are compared with [`FieldValue::structural_eq`], which treats
/// integers of different signedness and floats numerically and refuses to
/// compare values with no meaningful equality (NaN, opaque values).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// SQL `NULL` / absent optional value
    Null,
    /// Boolean column
    Bool(bool),
    /// Signed integer column
    Int(i64),
    /// Unsigned integer column
    UInt(u64),
    /// Floating point column
    Float(f64),
    /// Text column
    Text(String),
    /// Binary column
    Bytes(Vec<u8>),
    /// Timestamp column
    Timestamp(DateTime<Utc>),
    /// Array / repeated column
    List(Vec<FieldValue>),
    /// Nested document column
    Map(BTreeMap<String, FieldValue>),
    /// A value the engine exposes but which has no equality (described for logs)
    Opaque(String),
}

impl FieldValue {
    /// Compare two values by content.
    ///
    /// Returns `None` when either side cannot be compared: an opaque value or
    /// a NaN float anywhere inside it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use change_notify::record::FieldValue;
    ///
    /// assert_eq!(FieldValue::from("pending").structural_eq(&"pending".into()), Some(true));
    /// assert_eq!(FieldValue::Int(3).structural_eq(&FieldValue::UInt(3)), Some(true));
    /// assert_eq!(FieldValue::Float(f64::NAN).structural_eq(&FieldValue::Float(1.0)), None);
    /// ```
    pub fn structural_eq(&self, other: &FieldValue) -> Option<bool> {
        if !self.is_comparable() || !other.is_comparable() {
            return None;
        }
        Some(self.eq_comparable(other))
    }

    /// Whether this value has a meaningful equality.
    pub fn is_comparable(&self) -> bool {
        match self {
            Self::Float(f) => !f.is_nan(),
            Self::Opaque(_) => false,
            Self::List(items) => items.iter().all(Self::is_comparable),
            Self::Map(entries) => entries.values().all(Self::is_comparable),
            _ => true,
        }
    }

    // Both sides are known to be comparable here.
    fn eq_comparable(&self, other: &FieldValue) -> bool {
        use FieldValue::*;

        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (UInt(a), UInt(b)) => a == b,
            (Int(a), UInt(b)) | (UInt(b), Int(a)) => u64::try_from(*a).is_ok_and(|a| a == *b),
            (Float(a), Float(b)) => a == b,
            (Float(f), Int(i)) | (Int(i), Float(f)) => exact_i64(*f) == Some(*i),
            (Float(f), UInt(u)) | (UInt(u), Float(f)) => exact_u64(*f) == Some(*u),
            (Text(a), Text(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Timestamp(a), Timestamp(b)) => a == b,
            (List(a), List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_comparable(y))
            }
            (Map(a), Map(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(key, x)| b.get(key).is_some_and(|y| x.eq_comparable(y)))
            }
            _ => false,
        }
    }

    /// The same value with numbers in a single canonical kind: integral
    /// floats and unsigned values that fit become `Int`, larger integral
    /// floats become `UInt`. Structurally equal values normalize to equal
    /// values.
    pub fn normalized(&self) -> FieldValue {
        match self {
            Self::UInt(u) => i64::try_from(*u).map_or(Self::UInt(*u), Self::Int),
            Self::Float(f) => match (exact_i64(*f), exact_u64(*f)) {
                (Some(i), _) => Self::Int(i),
                (None, Some(u)) => Self::UInt(u),
                (None, None) => Self::Float(*f),
            },
            Self::List(items) => Self::List(items.iter().map(Self::normalized).collect()),
            Self::Map(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.normalized()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Short name of the value's kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Timestamp(_) => "timestamp",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Opaque(_) => "opaque",
        }
    }

    /// Borrow the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value as JSON.
    ///
    /// Non-finite floats become `null`, bytes become an array of numbers and
    /// timestamps become RFC 3339 strings.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::from(*i),
            Self::UInt(u) => JsonValue::from(*u),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Bytes(bytes) => JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
            Self::Timestamp(ts) => JsonValue::String(ts.to_rfc3339()),
            Self::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Self::Opaque(desc) => JsonValue::String(desc.clone()),
        }
    }
}

// 2^63 and 2^64 are exact in f64; the casts below only run on integral
// values strictly inside the target range, so they are lossless.
const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

fn exact_i64(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && (-TWO_POW_63..TWO_POW_63).contains(&f))
        .then(|| f as i64)
}

fn exact_u64(f: f64) -> Option<u64> {
    (f.is_finite() && f.fract() == 0.0 && (0.0..TWO_POW_64).contains(&f)).then(|| f as u64)
}

impl From<JsonValue> for FieldValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => Self::Text(s),
            JsonValue::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            JsonValue::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::UInt(value.into())
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_equality() {
        assert_eq!(FieldValue::from("a").structural_eq(&"a".into()), Some(true));
        assert_eq!(FieldValue::from("a").structural_eq(&"b".into()), Some(false));
        assert_eq!(FieldValue::Null.structural_eq(&FieldValue::Null), Some(true));
        assert_eq!(FieldValue::Null.structural_eq(&"a".into()), Some(false));
    }

    #[test]
    fn test_numeric_cross_kind() {
        assert_eq!(FieldValue::Int(7).structural_eq(&FieldValue::UInt(7)), Some(true));
        assert_eq!(FieldValue::Int(-1).structural_eq(&FieldValue::UInt(u64::MAX)), Some(false));
        assert_eq!(FieldValue::Float(2.0).structural_eq(&FieldValue::Int(2)), Some(true));
        assert_eq!(FieldValue::UInt(2).structural_eq(&FieldValue::Float(2.5)), Some(false));
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        let above = FieldValue::Int(9_007_199_254_740_993);
        let float = FieldValue::Float(9_007_199_254_740_992.0);
        let below = FieldValue::Int(9_007_199_254_740_992);

        assert_eq!(float.structural_eq(&below), Some(true));
        assert_eq!(above.structural_eq(&float), Some(false));
        assert_eq!(above.structural_eq(&below), Some(false));

        assert_eq!(
            FieldValue::UInt(u64::MAX).structural_eq(&FieldValue::Float(u64::MAX as f64)),
            Some(false)
        );
        assert_eq!(
            FieldValue::Int(i64::MIN).structural_eq(&FieldValue::Float(-9_223_372_036_854_775_808.0)),
            Some(true)
        );
        assert_eq!(
            FieldValue::Int(i64::MAX).structural_eq(&FieldValue::Float(i64::MAX as f64)),
            Some(false)
        );
    }

    #[test]
    fn test_normalized() {
        assert_eq!(FieldValue::Float(1.0).normalized(), FieldValue::Int(1));
        assert_eq!(FieldValue::Float(-0.0).normalized(), FieldValue::Int(0));
        assert_eq!(FieldValue::UInt(3).normalized(), FieldValue::Int(3));
        assert_eq!(FieldValue::UInt(u64::MAX).normalized(), FieldValue::UInt(u64::MAX));
        assert_eq!(
            FieldValue::Float(9_223_372_036_854_775_808.0).normalized(),
            FieldValue::UInt(9_223_372_036_854_775_808)
        );
        assert_eq!(FieldValue::Float(1.5).normalized(), FieldValue::Float(1.5));
        assert_eq!(
            FieldValue::List(vec![FieldValue::Float(2.0)]).normalized(),
            FieldValue::List(vec![FieldValue::Int(2)])
        );
    }

    #[test]
    fn test_mismatched_kinds_differ() {
        assert_eq!(FieldValue::from("1").structural_eq(&FieldValue::Int(1)), Some(false));
        assert_eq!(FieldValue::Bool(true).structural_eq(&FieldValue::Int(1)), Some(false));
    }

    #[test]
    fn test_incomparable_values() {
        let nan = FieldValue::Float(f64::NAN);
        assert_eq!(nan.structural_eq(&nan), None);

        let opaque = FieldValue::Opaque("geometry".into());
        assert_eq!(opaque.structural_eq(&FieldValue::Null), None);

        let nested = FieldValue::List(vec![FieldValue::Int(1), FieldValue::Float(f64::NAN)]);
        assert_eq!(nested.structural_eq(&FieldValue::List(vec![])), None);
    }

    #[test]
    fn test_nested_structures() {
        let a = FieldValue::from(json!({"tags": ["x", "y"], "n": 1}));
        let b = FieldValue::from(json!({"n": 1, "tags": ["x", "y"]}));
        let c = FieldValue::from(json!({"n": 1, "tags": ["y", "x"]}));

        assert_eq!(a.structural_eq(&b), Some(true));
        assert_eq!(a.structural_eq(&c), Some(false));
    }

    #[test]
    fn test_json_conversion() {
        assert_eq!(FieldValue::from(json!(5)), FieldValue::Int(5));
        assert_eq!(FieldValue::from(json!(u64::MAX)), FieldValue::UInt(u64::MAX));
        assert_eq!(FieldValue::from(json!(1.5)), FieldValue::Float(1.5));

        let value = FieldValue::from(json!({"a": [1, "b", null]}));
        assert_eq!(value.to_json(), json!({"a": [1, "b", null]}));
        assert_eq!(FieldValue::Float(f64::INFINITY).to_json(), JsonValue::Null);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(FieldValue::from(None::<i64>), FieldValue::Null);
        assert_eq!(FieldValue::from(Some("x")), FieldValue::Text("x".into()));
    }
}
