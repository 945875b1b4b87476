//! Shared data model for Triagem screens, stores, and events.

mod event;
pub mod mapping;
mod types;

pub use event::{Divergence, DivergenceKind, EventSink, StoreEvent};
pub use mapping::{
    AttendanceTypeBackend, PRIORITY_CONFIG, PriorityBackend, PriorityConfig, available_priorities,
    is_allowed_priority,
};
pub use types::{
    AttendanceType, CallId, CallType, Patient, PatientId, PatientStatus, PriorityLevel, SyncState,
    TriageCall,
};
