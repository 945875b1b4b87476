//! Patient-state synchronization for emergency-room screens.
//!
//! This crate owns the patient cache store, the recent-calls broadcast
//! channel, the polling refresh loop, and the public-panel announcer used by
//! every screen.

pub mod broadcast;
pub mod error;
mod event_bus;
pub mod panel;
pub mod polling;
mod reconcile;
pub mod rooms;
pub mod store;

pub use broadcast::CallBroadcast;
pub use error::TriageError;
pub use event_bus::EventBus;
pub use panel::{Announcer, CallAnnouncer, LogAnnouncer, PanelView, announcement_text};
pub use polling::RefreshLoop;
pub use rooms::RoomDirectory;
pub use store::{PatientStore, RefreshOutcome};
