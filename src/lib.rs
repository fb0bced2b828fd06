//! # change-notify
//!
//! Publish a message when one watched field of a persisted row changes.
//!
//! ## Overview
//!
//! `change-notify` wraps the writes of a persistence engine. Every call:
//! - reads the row as it is before the write
//! - performs the write (partial update or full upsert)
//! - reads the row back once the write committed
//! - compares the watched field and, only if it changed, hands a message to
//!   a queueing service
//!
//! Persistence errors fail the call. Notification problems never do: they
//! are logged and reported in the returned [`UpdateReport`](core::UpdateReport).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use change_notify::prelude::*;
//! use change_notify::publish::SubscriberRegistry;
//! use change_notify::record::Row;
//! use change_notify::store::{Filter, MemoryStore};
//! use serde_json::json;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::with_rows(
//!     "id",
//!     vec![Row::new().with("id", 42).with("status", "pending")],
//! )?;
//!
//! let registry = SubscriberRegistry::new();
//! let _handle = registry
//!     .subscribe("orders", |n| println!("order changed: {}", n.body))
//!     .await;
//!
//! let hook = ChangeNotifyHook::builder(store)
//!     .with_publisher(registry)
//!     .with_destination("orders")
//!     .build()?;
//!
//! let report = hook
//!     .update("status", &Filter::eq("id", 42), &json!({ "status": "shipped" }))
//!     .await?;
//! assert!(report.published().is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `memory-store` (default): in-memory [`Store`](store::Store) with JSON
//!   merge-patch updates
//! - `sqs`: publish to Amazon SQS
//! - `webhook`: publish by HTTP POST
//! - `metrics`: OpenTelemetry call and notification metrics

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod publish;
pub mod record;
pub mod settings;
pub mod store;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{
        ChangeNotifyHook, ChangeNotifyHookBuilder, FieldChange, NotifyOutcome, UpdateReport,
        Validate,
    };
    pub use crate::error::{HookError, NotifyError, Result, ValidationError};
    pub use crate::publish::{MessageBuilder, Notification, Publisher};
    pub use crate::record::{FieldValue, Record};
    pub use crate::settings::HookSettings;
    pub use crate::store::Store;
}
