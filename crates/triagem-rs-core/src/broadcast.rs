//! Recent-call broadcast over durable storage.

use crate::error::TriageError;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use triagem_rs_protocol::TriageCall;
use triagem_rs_storage::DurableStore;

/// Publishes the recent-calls list and relays changes from other contexts.
#[derive(Clone)]
pub struct CallBroadcast {
    storage: Arc<dyn DurableStore>,
    key: String,
}

impl CallBroadcast {
    pub fn new(storage: Arc<dyn DurableStore>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Persist the list so every other context sees it.
    pub fn publish(&self, calls: &[TriageCall]) -> Result<(), TriageError> {
        let payload = serde_json::to_string(calls)?;
        self.storage.set(&self.key, &payload)?;
        debug!(
            "published recent calls (key={}, count={})",
            self.key,
            calls.len()
        );
        Ok(())
    }

    /// Read the persisted list; missing or corrupt data yields an empty list.
    pub fn load(&self) -> Vec<TriageCall> {
        match self.storage.get(&self.key) {
            Ok(Some(raw)) => decode_calls(&self.key, &raw).unwrap_or_default(),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("failed to read recent calls (key={}): {err}", self.key);
                Vec::new()
            }
        }
    }

    /// Relay call-list changes written by other contexts.
    ///
    /// The handler receives each decoded list and returns `false` to stop the
    /// listener. Subscription happens before this returns, so writes made
    /// right after the call are not missed.
    pub fn spawn_listener<F>(&self, on_calls: F) -> JoinHandle<()>
    where
        F: Fn(Vec<TriageCall>) -> bool + Send + 'static,
    {
        let mut receiver = self.storage.subscribe();
        let own_context = self.storage.context_id();
        let broadcast = self.clone();
        info!(
            "listening for recent-call changes (key={}, context={})",
            self.key, own_context
        );
        tokio::spawn(async move {
            loop {
                let calls = match receiver.recv().await {
                    Ok(event) => {
                        if event.key != broadcast.key || event.origin == own_context {
                            continue;
                        }
                        let Some(raw) = event.new_value else {
                            debug!("recent calls removed externally (key={})", event.key);
                            continue;
                        };
                        match decode_calls(&broadcast.key, &raw) {
                            Some(calls) => calls,
                            None => continue,
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(
                            "recent-call listener lagged, reloading (key={}, skipped={})",
                            broadcast.key, skipped
                        );
                        broadcast.load()
                    }
                    Err(RecvError::Closed) => break,
                };
                if !on_calls(calls) {
                    break;
                }
            }
            debug!("recent-call listener stopped (key={})", broadcast.key);
        })
    }
}

/// Decode a persisted call list, logging and discarding corrupt payloads.
fn decode_calls(key: &str, raw: &str) -> Option<Vec<TriageCall>> {
    match serde_json::from_str(raw) {
        Ok(calls) => Some(calls),
        Err(err) => {
            warn!("ignoring corrupt recent calls (key={}): {err}", key);
            None
        }
    }
}
