//! Broadcast-backed event bus for store notifications.

use log::debug;
use tokio::sync::broadcast;
use triagem_rs_protocol::{EventSink, StoreEvent};

/// Fan-out of store events to every subscribed screen.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel buffer size.
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer);
        debug!("store event bus initialized (buffer={})", buffer);
        Self { sender }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for EventBus {
    /// Emit an event into the broadcast channel; dropped when nobody listens.
    fn emit(&self, event: StoreEvent) {
        let _ = self.sender.send(event);
    }
}
