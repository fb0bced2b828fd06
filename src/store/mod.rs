//! Persistence engine abstraction and implementations.

mod engine;

#[cfg(feature = "memory-store")]
mod memory;

pub use engine::{Store, StoreResult};

#[cfg(feature = "memory-store")]
pub use memory::{Filter, MemoryStore};
