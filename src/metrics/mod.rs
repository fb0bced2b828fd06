//! Built-in metrics for hook calls.
//!
//! Provides OpenTelemetry metrics tracking:
//! - Calls and failed calls
//! - Call duration
//! - Detected changes
//! - Published, lost and skipped notifications
//! - Time since the last published notification
//!
//! # Examples
//!
//! ```rust,no_run
//! use change_notify::prelude::*;
//! use change_notify::publish::SubscriberRegistry;
//! use change_notify::store::MemoryStore;
//! use opentelemetry::global;
//!
//! # fn example() -> Result<()> {
//! let meter = global::meter("orders-service");
//!
//! let hook = ChangeNotifyHook::builder(MemoryStore::new("id"))
//!     .with_publisher(SubscriberRegistry::new())
//!     .with_destination("orders")
//!     .with_metrics(meter)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod hook_metrics;

pub use hook_metrics::HookMetrics;
