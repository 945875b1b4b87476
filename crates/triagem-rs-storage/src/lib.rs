//! Durable key-value storage with change notifications.
//!
//! Every handle belongs to one context (a screen). Writes are visible to all
//! handles over the same storage, and each write is announced on a broadcast
//! channel tagged with the writer's context so listeners can skip their own
//! changes.

pub mod error;
pub mod file;
pub mod memory;
pub mod provider;

/// Storage error type.
pub use error::StorageError;
/// File-backed store shared across processes.
pub use file::FileDurableStore;
/// In-process store shared across handles.
pub use memory::MemoryDurableStore;
/// Storage interface and change event.
pub use provider::{ContextId, DurableStore, EXTERNAL_ORIGIN, StorageEvent, validate_key};
