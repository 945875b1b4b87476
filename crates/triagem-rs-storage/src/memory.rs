//! In-process durable store shared across handles.

use crate::error::StorageError;
use crate::provider::{ContextId, DurableStore, EVENT_BUFFER, StorageEvent};
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

struct Shared {
    values: RwLock<HashMap<String, String>>,
    sender: broadcast::Sender<StorageEvent>,
}

/// Map-backed store; every `handle()` is a new context over the same data.
#[derive(Clone)]
pub struct MemoryDurableStore {
    shared: Arc<Shared>,
    context_id: ContextId,
}

impl MemoryDurableStore {
    /// Create empty storage with a first context.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            shared: Arc::new(Shared {
                values: RwLock::new(HashMap::new()),
                sender,
            }),
            context_id: Uuid::new_v4(),
        }
    }

    /// Open another context over the same storage.
    pub fn handle(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            context_id: Uuid::new_v4(),
        }
    }

    fn notify(&self, key: &str, new_value: Option<String>) {
        debug!(
            "storage change (key={}, removed={}, origin={})",
            key,
            new_value.is_none(),
            self.context_id
        );
        let _ = self.shared.sender.send(StorageEvent {
            key: key.to_string(),
            new_value,
            origin: self.context_id,
        });
    }
}

impl Default for MemoryDurableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DurableStore for MemoryDurableStore {
    fn context_id(&self) -> ContextId {
        self.context_id
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.shared.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let previous = self
            .shared
            .values
            .write()
            .insert(key.to_string(), value.to_string());
        if previous.as_deref() != Some(value) {
            self.notify(key, Some(value.to_string()));
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.shared.values.write().remove(key).is_some() {
            self.notify(key, None);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.shared.sender.subscribe()
    }
}
