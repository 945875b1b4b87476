//! Durable store abstraction and change events.

use crate::error::StorageError;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Identifier of the context (screen) that owns a store handle.
pub type ContextId = Uuid;

/// Origin used for changes observed on disk whose writer is unknown.
pub const EXTERNAL_ORIGIN: ContextId = Uuid::nil();

/// Buffer size for change notification channels.
pub(crate) const EVENT_BUFFER: usize = 64;

/// Change notification for a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Key that changed.
    pub key: String,
    /// New value, or `None` when the key was removed.
    pub new_value: Option<String>,
    /// Context that performed the write.
    pub origin: ContextId,
}

/// Durable key-value publish/subscribe storage.
pub trait DurableStore: Send + Sync {
    /// Context that writes through this handle.
    fn context_id(&self) -> ContextId;

    /// Read the current value for a key.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, notifying subscribers when it changed.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key, notifying subscribers when it existed.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Subscribe to change events from every context over this storage.
    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

/// Reject keys that cannot be used as file names.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
