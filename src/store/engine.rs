//! Persistence engine trait.

use crate::error::StoreError;
use crate::record::Record;
use async_trait::async_trait;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The persistence engine a hook wraps.
///
/// Implement this trait over your ORM or database client. The hook calls it
/// in a fixed order per update: [`find_one`](Store::find_one), then
/// [`update`](Store::update) or [`upsert`](Store::upsert), then `find_one`
/// again with the row's [`identity_filter`](Store::identity_filter).
/// Transactions, retries and SQL generation stay inside the engine.
#[async_trait]
pub trait Store: Send + Sync {
    /// Snapshot type read back from the engine.
    type Row: Record + Send + Sync;

    /// Query predicate selecting rows.
    type Filter: Send + Sync;

    /// Partial set of new values for an update.
    type Patch: Send + Sync;

    /// Read the single row matching `filter`.
    ///
    /// # Errors
    ///
    /// Should return [`StoreError::NotFound`] if nothing matches and
    /// [`StoreError::Ambiguous`] if more than one row matches.
    async fn find_one(&self, filter: &Self::Filter) -> StoreResult<Self::Row>;

    /// Apply `patch` to every row matching `filter`, returning the number of
    /// rows affected.
    async fn update(&self, filter: &Self::Filter, patch: &Self::Patch) -> StoreResult<u64>;

    /// Insert `row`, or replace the existing row with the same identity.
    async fn upsert(&self, row: &Self::Row) -> StoreResult<()>;

    /// Build a filter selecting exactly `row` by its primary key.
    ///
    /// Returns `None` if the row carries no identity.
    fn identity_filter(&self, row: &Self::Row) -> Option<Self::Filter>;

    /// Get a human-readable name for this store (for logging/debugging).
    fn name(&self) -> String;
}
