//! In-memory reference store.

use super::{Store, StoreResult};
use crate::error::StoreError;
use crate::record::{FieldValue, Record, Row};
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

type Document = Map<String, JsonValue>;

/// Equality filter over named columns.
///
/// All predicates must hold for a row to match. An empty filter matches
/// every row.
///
/// # Examples
///
/// ```rust
/// use change_notify::store::Filter;
///
/// let filter = Filter::eq("tenant", "acme").and("id", 7);
/// assert_eq!(filter.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<(String, FieldValue)>,
}

impl Filter {
    /// A filter matching rows whose `field` equals `value`.
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::default().and(field, value)
    }

    /// Add another equality predicate.
    pub fn and(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.predicates.push((field.into(), value.into()));
        self
    }

    /// Number of predicates.
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Whether the filter has no predicates.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Check a record against every predicate.
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        self.predicates.iter().all(|(field, expected)| {
            record
                .field(field)
                .and_then(|actual| actual.structural_eq(expected))
                .unwrap_or(false)
        })
    }
}

/// A [`Store`] that keeps rows in memory, keyed by a primary-key column.
///
/// Partial updates are JSON merge patches (RFC 7396): members set to `null`
/// are cleared, nested objects are merged. `find_one` enforces the single-row
/// contract the hook relies on.
///
/// # Examples
///
/// ```rust
/// use change_notify::record::Row;
/// use change_notify::store::{Filter, MemoryStore, Store};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), change_notify::error::StoreError> {
/// let store = MemoryStore::new("id");
/// store.insert(Row::new().with("id", 1).with("status", "pending")).await?;
///
/// store.update(&Filter::eq("id", 1), &json!({ "status": "shipped" })).await?;
/// let row = store.find_one(&Filter::eq("id", 1)).await?;
/// assert_eq!(row.get("status").and_then(|v| v.as_text()), Some("shipped"));
/// # Ok(())
/// # }
/// ```
pub struct MemoryStore {
    key_field: String,
    rows: RwLock<BTreeMap<String, Document>>,
}

impl MemoryStore {
    /// Create an empty store keyed by `key_field`.
    pub fn new(key_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a store pre-populated with `rows`.
    ///
    /// # Errors
    ///
    /// Returns an error if a row has no key or two rows share a key.
    pub fn with_rows(
        key_field: impl Into<String>,
        rows: impl IntoIterator<Item = Row>,
    ) -> StoreResult<Self> {
        let key_field = key_field.into();
        let mut map = BTreeMap::new();
        for row in rows {
            let key = key_of(&key_field, &row)?;
            if map.insert(key.clone(), into_document(&row)).is_some() {
                return Err(StoreError::Rejected(format!("duplicate key {}", key)));
            }
        }

        Ok(Self {
            key_field,
            rows: RwLock::new(map),
        })
    }

    /// The primary-key column name.
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// Insert a new row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row has no key or the key is already taken.
    pub async fn insert(&self, row: Row) -> StoreResult<()> {
        let key = key_of(&self.key_field, &row)?;
        let mut rows = self.rows.write().await;
        if rows.contains_key(&key) {
            return Err(StoreError::Rejected(format!("duplicate key {}", key)));
        }
        rows.insert(key, into_document(&row));
        Ok(())
    }

    /// Fetch a row by primary key.
    pub async fn get(&self, key: impl Into<FieldValue>) -> Option<Row> {
        let key = render_key(&key.into());
        let rows = self.rows.read().await;
        rows.get(&key).map(|doc| self.to_row(doc))
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Whether the store holds no rows.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn to_row(&self, doc: &Document) -> Row {
        Row::from_json_map(doc.clone()).with_key_field(self.key_field.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Row = Row;
    type Filter = Filter;
    type Patch = JsonValue;

    async fn find_one(&self, filter: &Filter) -> StoreResult<Row> {
        let rows = self.rows.read().await;
        let mut matches = rows.values().filter(|doc| filter.matches(*doc));

        let first = matches.next().ok_or(StoreError::NotFound)?;
        let extra = matches.count();
        if extra > 0 {
            return Err(StoreError::Ambiguous { matches: extra + 1 });
        }

        Ok(self.to_row(first))
    }

    async fn update(&self, filter: &Filter, patch: &JsonValue) -> StoreResult<u64> {
        if !patch.is_object() {
            return Err(StoreError::Rejected(
                "partial update must be a JSON object".to_string(),
            ));
        }

        let mut rows = self.rows.write().await;

        // Compute every patched document before touching the map so a rejected
        // patch leaves all rows unchanged.
        let mut patched = Vec::new();
        for (key, doc) in rows.iter().filter(|(_, doc)| filter.matches(*doc)) {
            let mut merged = JsonValue::Object(doc.clone());
            json_patch::merge(&mut merged, patch);

            let JsonValue::Object(merged) = merged else {
                return Err(StoreError::Rejected(
                    "partial update did not produce an object".to_string(),
                ));
            };

            if merged.get(&self.key_field) != doc.get(&self.key_field) {
                return Err(StoreError::Rejected(format!(
                    "partial update cannot change key column '{}'",
                    self.key_field
                )));
            }

            patched.push((key.clone(), merged));
        }

        let affected = patched.len() as u64;
        for (key, doc) in patched {
            rows.insert(key, doc);
        }

        Ok(affected)
    }

    async fn upsert(&self, row: &Row) -> StoreResult<()> {
        let key = key_of(&self.key_field, row)?;
        let mut rows = self.rows.write().await;
        rows.insert(key, into_document(row));
        Ok(())
    }

    fn identity_filter(&self, row: &Row) -> Option<Filter> {
        match row.get(&self.key_field) {
            Some(FieldValue::Null) | None => None,
            Some(value) => Some(Filter::eq(self.key_field.clone(), value.clone())),
        }
    }

    fn name(&self) -> String {
        format!("memory:{}", self.key_field)
    }
}

fn into_document(row: &Row) -> Document {
    match row.to_json() {
        JsonValue::Object(map) => map,
        _ => Document::new(),
    }
}

fn key_of(key_field: &str, row: &Row) -> StoreResult<String> {
    match row.get(key_field) {
        Some(FieldValue::Null) | None => Err(StoreError::Rejected(format!(
            "row has no value for key column '{}'",
            key_field
        ))),
        Some(value) => Ok(render_key(value)),
    }
}

// Keys that compare equal must land on the same entry, so `1`, `1u64` and
// `1.0` all render as `1`.
fn render_key(value: &FieldValue) -> String {
    value.normalized().to_json().to_string()
}
